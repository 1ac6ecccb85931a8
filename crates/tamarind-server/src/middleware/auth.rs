// Authentication middleware for Actix-web
// Validates the bearer token of every protected request and attaches the
// resulting AuthContext to the request extensions

use std::rc::Rc;

use actix_service::forward_ready;
use actix_utils::future::{Ready, ok};
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    web::Data,
};
use futures::future::LocalBoxFuture;

use tamarind_auth::{AUTHORIZATION_HEADER, TOKEN_PREFIX};
use tamarind_common::TamarindError;

use crate::{error::ApiError, model::app_state::AppState};

// Authentication middleware transformer
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthenticationMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct AuthenticationMiddleware<S> {
    service: Rc<S>,
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn extract_token(req: &ServiceRequest) -> Option<String> {
    let header_val = req.headers().get(AUTHORIZATION_HEADER)?;
    let token = header_val.to_str().ok()?.trim().strip_prefix(TOKEN_PREFIX)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn reject<B>(req: ServiceRequest, err: ApiError) -> ServiceResponse<EitherBody<B>> {
    tracing::debug!(path = req.path(), "Request rejected: {}", err);
    req.into_response(err.error_response()).map_into_right_body()
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let Some(app_state) = req.app_data::<Data<AppState>>().cloned() else {
                tracing::error!("AppState not found in request app_data");
                let err = TamarindError::Internal("application state missing".to_string());
                return Ok(reject(req, err.into()));
            };

            let Some(token) = extract_token(&req) else {
                return Ok(reject(
                    req,
                    TamarindError::unauthorized("missing bearer token").into(),
                ));
            };

            match app_state.session_service.authorize(&token).await {
                Ok(auth_context) => {
                    req.extensions_mut().insert(auth_context);
                }
                Err(e) => return Ok(reject(req, e.into())),
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}
