use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// Extracts the authenticated user's ID from request extensions.
///
/// This extractor is intended for routes protected by `SessionGate`, which
/// validates the session token and inserts the decoded claims into request
/// extensions. If no claims are present (e.g. the gate did not run), the
/// extractor fails with `AppError::Unauthorized`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUserId(pub i32);

impl FromRequest for AuthenticatedUserId {
    type Error = ActixError; // AppError will be converted into ActixError via ResponseError
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) => ready(Ok(AuthenticatedUserId(claims.sub))),
            None => {
                // Only reachable when a handler using this extractor is
                // registered outside the session gate's scope.
                let err = AppError::Unauthorized(
                    "No session attached to request. Ensure SessionGate is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}
