use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the claims encoded within a session token (JWT).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token, the user's unique identifier.
    pub sub: i32,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
}

/// Failure modes of token verification and issuance.
///
/// Verification distinguishes three cases: the token could not be parsed at
/// all (`Malformed`), the signature does not match (`SignatureInvalid`), or
/// the token is past its expiry (`Expired`). `Encoding` covers issuance
/// failures inside `jsonwebtoken` and maps to a 500 at the HTTP boundary.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    SignatureInvalid,
    Expired,
    Encoding(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "malformed token"),
            TokenError::SignatureInvalid => write!(f, "invalid signature"),
            TokenError::Expired => write!(f, "token expired"),
            TokenError::Encoding(msg) => write!(f, "token encoding failed: {}", msg),
        }
    }
}

/// Issues and verifies signed, time-limited session tokens.
///
/// Holds the HS256 keys derived from the configured secret and a fixed TTL.
/// Both operations are pure computations over the token string; the codec
/// keeps no per-session state, so a token's validity is determined entirely
/// by its signature and expiry at verification time.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::hours(ttl_hours),
        }
    }

    /// Mints a token for the given user ID, valid for the configured TTL.
    pub fn issue(&self, user_id: i32) -> Result<String, TokenError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.ttl)
            .expect("valid timestamp")
            .timestamp() as usize;

        let claims = Claims {
            sub: user_id,
            iat: now.timestamp() as usize,
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies a token's signature and expiry and decodes its claims.
    ///
    /// Expiry is checked with zero leeway, so a token is rejected the moment
    /// `exp` passes.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                _ => TokenError::Malformed,
            })
    }
}
