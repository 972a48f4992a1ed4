use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};
use taskboard::auth::{AuthMiddleware, TokenService};
use taskboard::db::{self, DatabaseConfig};
use taskboard::{routes, AppError, Config};

fn io_error(err: AppError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

fn cors(config: &Config) -> Cors {
    let cors = if config.allows_any_origin() {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allow_any_method().allow_any_header().max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io_error)?;

    let pool = db::connect(&DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: config.database_max_connections,
        ..Default::default()
    })
    .await
    .map_err(io_error)?;

    let tokens = TokenService::from_config(&config);

    log::info!("Starting Kanban Board API at {}", config.server_url());

    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(tokens.clone()))
            .configure(routes::config)
            .wrap(AuthMiddleware)
            .wrap(NormalizePath::trim())
            .wrap(Logger::default())
            .wrap(cors(&server_config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
