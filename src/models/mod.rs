pub mod project;
pub mod task;
pub mod user;

pub use project::{Project, ProjectInput, ProjectUpdate, ProjectWithTasks};
pub use task::{Task, TaskInput, TaskQuery, TaskStatus, TaskStatusUpdate, TaskUpdate};
pub use user::{NewUser, Role, User};
