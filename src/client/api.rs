use async_trait::async_trait;
use serde_json::json;
use std::fmt;

use crate::models::UserIdentity;

/// Failure modes of the auth API as seen from the client.
///
/// `Rejected` is an expected outcome (bad credentials, expired session) and
/// carries the HTTP status; `Network` means the request never completed.
/// The session controller treats both as "not authenticated" and never
/// propagates either as a panic.
#[derive(Debug)]
pub enum ApiError {
    Rejected(u16),
    Network(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::Rejected(status) => write!(f, "server rejected request ({})", status),
            ApiError::Network(msg) => write!(f, "network failure: {}", msg),
        }
    }
}

/// Client-side view of the auth endpoints.
///
/// The session controller is generic over this trait so UI code can run
/// against the real HTTP implementation while tests substitute scripted
/// fakes.
#[async_trait]
pub trait AuthApi {
    async fn profile(&self) -> Result<UserIdentity, ApiError>;

    async fn login(&self, email: &str, password: &str) -> Result<UserIdentity, ApiError>;

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    async fn update_profile(&self, username: &str, email: &str)
        -> Result<UserIdentity, ApiError>;

    async fn change_password(&self, old_password: &str, new_password: &str)
        -> Result<(), ApiError>;
}

/// `AuthApi` over HTTP, backed by `reqwest`.
///
/// The client's cookie jar holds the HTTP-only session cookie set by
/// login/register and sends it back automatically on every request, so no
/// token ever passes through calling code.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn identity_from(response: reqwest::Response) -> Result<UserIdentity, ApiError> {
        if !response.status().is_success() {
            return Err(ApiError::Rejected(response.status().as_u16()));
        }
        response
            .json::<UserIdentity>()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    fn unit_from(response: reqwest::Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Rejected(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn profile(&self) -> Result<UserIdentity, ApiError> {
        let response = self
            .client
            .get(self.url("/api/auth/profile"))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::identity_from(response).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<UserIdentity, ApiError> {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::identity_from(response).await
    }

    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, ApiError> {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::identity_from(response).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.url("/api/auth/logout"))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::unit_from(response)
    }

    async fn update_profile(
        &self,
        username: &str,
        email: &str,
    ) -> Result<UserIdentity, ApiError> {
        let response = self
            .client
            .put(self.url("/api/auth/profile"))
            .json(&json!({ "username": username, "email": email }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::identity_from(response).await
    }

    async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url("/api/auth/change-password"))
            .json(&json!({ "old_password": old_password, "new_password": new_password }))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::unit_from(response)
    }
}
