pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use actix_web::cookie::{Cookie, SameSite};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

// Re-export necessary items
pub use extractors::AuthenticatedUserId;
pub use middleware::SessionGate;
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenCodec, TokenError};

/// Name of the HTTP-only cookie carrying the session token.
pub const SESSION_COOKIE: &str = "taskhive_session";

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Builds the session cookie set on successful login/registration.
///
/// HTTP-only so scripts cannot read the token; the browser sends it back
/// automatically on every request under `/`.
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Builds the removal cookie sent by logout: same name and path, immediately
/// expired so the browser drops the stored token.
pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}

/// Represents the payload for a user login request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// User's password.
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Must be between 3 and 32 characters, alphanumeric, and can include underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Email address for the new account.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// Password for the new account.
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Payload for updating the authenticated user's profile.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
}

/// Payload for changing the authenticated user's password.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 6))]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_login_request_validation() {
        let valid_login = LoginRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_login.validate().is_ok());

        let invalid_email_login = LoginRequest {
            email: "testexample.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(invalid_email_login.validate().is_err());

        let short_password_login = LoginRequest {
            email: "test@example.com".to_string(),
            password: "123".to_string(),
        };
        assert!(short_password_login.validate().is_err());
    }

    #[test]
    fn test_register_request_validation() {
        let valid_register = RegisterRequest {
            username: "test_user-123".to_string(),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(valid_register.validate().is_ok());

        let invalid_username_register = RegisterRequest {
            username: "test user!".to_string(), // Contains space and exclamation
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(invalid_username_register.validate().is_err());

        let short_username_register = RegisterRequest {
            username: "tu".to_string(),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(short_username_register.validate().is_err());
    }

    #[test]
    fn test_change_password_request_validation() {
        let valid = ChangePasswordRequest {
            old_password: "oldpass1".to_string(),
            new_password: "newpass123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let short_new = ChangePasswordRequest {
            old_password: "oldpass1".to_string(),
            new_password: "123".to_string(),
        };
        assert!(short_new.validate().is_err());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("some-token".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "some-token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));

        let removal = expired_session_cookie();
        assert_eq!(removal.name(), SESSION_COOKIE);
        assert_eq!(removal.value(), "");
    }
}
