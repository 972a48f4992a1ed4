use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    web, Error, HttpMessage, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::TokenService;
use crate::error::AppError;

/// Paths reachable without a bearer token.
const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/health",
    "/auth/signup",
    "/auth/login",
    "/auth/login/json",
];

fn is_public(req: &ServiceRequest) -> bool {
    req.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&req.path())
}

/// Token part of an `Authorization` value. The scheme is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Verifies the `Authorization: Bearer <token>` header and stores the decoded
/// [`Claims`](crate::auth::Claims) in the request extensions.
///
/// Rejected requests are answered here with the `AppError` response, so outer
/// middleware such as CORS still sees a regular response.
///
/// Requires a `web::Data<TokenService>` in the app data.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(&req) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let verified = match req.app_data::<web::Data<TokenService>>() {
            Some(tokens) => {
                let bearer = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(bearer_token);

                match bearer {
                    Some(token) => tokens.verify(token).map_err(AppError::from),
                    None => Err(AppError::Unauthorized("Not authenticated".into())),
                }
            }
            None => Err(AppError::InternalServerError(
                "TokenService is not registered".into(),
            )),
        };

        match verified {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                let response = req
                    .into_response(app_err.error_response())
                    .map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use actix_web::{test, App, HttpResponse};
    use chrono::Duration;

    fn tokens() -> TokenService {
        TokenService::new("middleware-secret", Duration::minutes(30))
    }

    async fn protected() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[::core::prelude::v1::test]
    fn test_bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }

    #[actix_rt::test]
    async fn test_rejection_is_a_response() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(tokens()))
                .route("/protected", web::get().to(protected))
                .wrap(AuthMiddleware),
        )
        .await;

        let req = test::TestRequest::get().uri("/protected").to_request();
        let resp = test::try_call_service(&app, req).await.unwrap();
        assert_eq!(resp.status(), 401);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[actix_rt::test]
    async fn test_lowercase_scheme_is_accepted() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(tokens()))
                .route("/protected", web::get().to(protected))
                .wrap(AuthMiddleware),
        )
        .await;

        let token = tokens().issue(5, Role::Member).unwrap();
        let req = test::TestRequest::get()
            .uri("/protected")
            .insert_header((header::AUTHORIZATION, format!("bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }
}
