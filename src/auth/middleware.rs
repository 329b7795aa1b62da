use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::sync::Arc;

use crate::auth::token::TokenCodec;
use crate::auth::SESSION_COOKIE;

/// Per-request session gate.
///
/// Wrapped around the protected scope, it extracts the session token (cookie
/// first, `Authorization: Bearer` fallback), verifies it with the codec and
/// inserts the decoded claims into the request extensions for downstream
/// extractors. Requests without a valid token are rejected with 401 before
/// any handler runs. The gate never consults the credential store; resolving
/// identity from a token is a pure decode.
pub struct SessionGate {
    codec: Arc<TokenCodec>,
}

impl SessionGate {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec: Arc::new(codec),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGateService {
            service,
            codec: Arc::clone(&self.codec),
        }))
    }
}

pub struct SessionGateService<S> {
    service: S,
    codec: Arc<TokenCodec>,
}

impl<S, B> Service<ServiceRequest> for SessionGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Session establishment and teardown run without identity.
        let path = req.path();
        if path == "/health"
            || path.starts_with("/api/auth/login")
            || path.starts_with("/api/auth/register")
            || path.starts_with("/api/auth/logout")
        {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        // Cookie takes precedence; the bearer header serves non-browser clients.
        let token = req
            .cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| {
                req.headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.strip_prefix("Bearer "))
                    .map(|s| s.to_string())
            });

        match token {
            Some(token) => match self.codec.verify(&token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    let fut = self.service.call(req);
                    Box::pin(fut)
                }
                Err(token_err) => {
                    log::debug!("rejected token for {}: {}", req.path(), token_err);
                    let app_err = crate::error::AppError::from(token_err);
                    Box::pin(async move { Err(app_err.into()) })
                }
            },
            None => {
                let app_err = crate::error::AppError::Unauthorized("Missing token".into());
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}
