use crate::{
    auth::{
        expired_session_cookie, session_cookie, ChangePasswordRequest, LoginRequest,
        RegisterRequest, TokenCodec, UpdateProfileRequest,
    },
    auth::extractors::AuthenticatedUserId,
    error::AppError,
    store::{CredentialStore, StoreError},
};
use actix_web::{get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use validator::Validate;

/// Register a new user
///
/// Creates a new user account, establishes a session and returns the public
/// identity. The session token travels in an HTTP-only cookie, not the body.
#[post("/register")]
pub async fn register(
    store: web::Data<dyn CredentialStore>,
    codec: web::Data<TokenCodec>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    register_data.validate()?;

    // Uniqueness of the email is enforced by the store atomically.
    let identity = store
        .create(
            &register_data.username,
            &register_data.email,
            &register_data.password,
        )
        .await?;

    let token = codec.issue(identity.id)?;
    log::info!("registered user {}", identity.id);

    Ok(HttpResponse::Created()
        .cookie(session_cookie(token))
        .json(identity))
}

/// Login user
///
/// Authenticates a user and establishes a session. `NotFound` and
/// `PasswordMismatch` deliberately collapse into one generic message so the
/// response does not reveal which emails are registered.
#[post("/login")]
pub async fn login(
    store: web::Data<dyn CredentialStore>,
    codec: web::Data<TokenCodec>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Validate input
    login_data.validate()?;

    match store
        .verify_password(&login_data.email, &login_data.password)
        .await
    {
        Ok(identity) => {
            let token = codec.issue(identity.id)?;
            Ok(HttpResponse::Ok()
                .cookie(session_cookie(token))
                .json(identity))
        }
        Err(StoreError::NotFound) | Err(StoreError::PasswordMismatch) => {
            log::warn!("failed login attempt for {}", login_data.email);
            Err(AppError::Unauthorized("Invalid credentials".into()))
        }
        Err(other) => Err(other.into()),
    }
}

/// Logout
///
/// Clears the session cookie. Idempotent: succeeds whether or not a valid
/// session existed, and requires no authentication. The server tracks no
/// session state, so expiring the cookie is the whole operation.
#[get("/logout")]
pub async fn logout() -> impl Responder {
    HttpResponse::Ok()
        .cookie(expired_session_cookie())
        .json(json!({ "message": "Logged out" }))
}

/// Current user's profile (protected).
#[get("/profile")]
pub async fn profile(
    store: web::Data<dyn CredentialStore>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let identity = store.find_by_id(user.0).await?;
    Ok(HttpResponse::Ok().json(identity))
}

/// Update the current user's username and email (protected).
#[put("/profile")]
pub async fn update_profile(
    store: web::Data<dyn CredentialStore>,
    user: AuthenticatedUserId,
    update_data: web::Json<UpdateProfileRequest>,
) -> Result<impl Responder, AppError> {
    update_data.validate()?;

    let identity = store
        .update_profile(user.0, &update_data.username, &update_data.email)
        .await?;
    Ok(HttpResponse::Ok().json(identity))
}

/// Change the current user's password (protected).
///
/// The old password is re-verified by the store before the hash is replaced;
/// a mismatch surfaces as 400, distinguishable from an expired session's 401.
#[put("/change-password")]
pub async fn change_password(
    store: web::Data<dyn CredentialStore>,
    user: AuthenticatedUserId,
    change_data: web::Json<ChangePasswordRequest>,
) -> Result<impl Responder, AppError> {
    change_data.validate()?;

    store
        .update_password(user.0, &change_data.old_password, &change_data.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated" })))
}
