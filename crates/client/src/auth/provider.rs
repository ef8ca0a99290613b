//! Identity provider seam.
//!
//! Token issuance sits behind [`IdentityProvider`] so the rest of the SDK
//! never cares where tokens come from. Two implementations ship:
//!
//! - [`MockIdentityProvider`] - issues `dev-jwt-token-*` development tokens
//!   locally, with no backend involved
//! - [`RestClient`] - drives the backend's `/auth` endpoints
//!
//! Swapping one for the other (or for a real OAuth/JWT provider) touches
//! nothing outside [`Storefront::with_provider`](crate::Storefront).

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

use tundra_core::{CustomerId, Email};

use crate::api::{ApiError, RestClient};

use super::error::AuthError;
use super::{Profile, Registration};

/// Prefix of locally issued development access tokens. Tokens with this
/// prefix never count as expired.
pub const DEV_TOKEN_PREFIX: &str = "dev-jwt-token-";

/// Prefix of locally issued development refresh tokens.
pub const DEV_REFRESH_PREFIX: &str = "dev-refresh-token-";

/// Tokens and profile produced by a successful login, registration, or
/// restore at the provider.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Customer profile as the provider knows it.
    pub profile: Profile,
    /// Bearer token for authenticated API calls.
    pub access_token: String,
    /// Token used to obtain a fresh access token.
    pub refresh_token: String,
}

/// Issues, refreshes, and revokes session tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange validated credentials for a session.
    async fn login(&self, email: &Email, password: &str) -> Result<IssuedSession, AuthError>;

    /// Create an account and return its first session.
    async fn register(&self, registration: &Registration) -> Result<IssuedSession, AuthError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError>;

    /// Invalidate the session server-side. Best-effort; callers treat
    /// failures as non-blocking.
    async fn logout(&self, access_token: &str) -> Result<(), AuthError>;

    /// Change the account password.
    async fn change_password(
        &self,
        access_token: &str,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock provider
// ─────────────────────────────────────────────────────────────────────────────

/// Development identity provider.
///
/// Accepts any validated credentials and issues `dev-jwt-token-*` tokens
/// without talking to a backend. The profile is synthesized from the email.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockIdentityProvider;

impl MockIdentityProvider {
    /// Create a new mock provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn mint(prefix: &str) -> String {
        let entropy: u32 = rand::rng().random();
        format!("{prefix}{}-{entropy:08x}", Utc::now().timestamp_millis())
    }

    fn dev_profile(email: &Email, first_name: &str, last_name: &str) -> Profile {
        Profile {
            id: CustomerId::new(1),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: email.clone(),
            phone: Some("+1 555 0100".to_owned()),
            address: Some("123 Test Street".to_owned()),
            city: Some("Springfield".to_owned()),
            postal_code: Some("01234".to_owned()),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn login(&self, email: &Email, _password: &str) -> Result<IssuedSession, AuthError> {
        Ok(IssuedSession {
            profile: Self::dev_profile(email, "Dev", "Customer"),
            access_token: Self::mint(DEV_TOKEN_PREFIX),
            refresh_token: Self::mint(DEV_REFRESH_PREFIX),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<IssuedSession, AuthError> {
        let email = Email::parse(&registration.email)?;
        Ok(IssuedSession {
            profile: Self::dev_profile(
                &email,
                &registration.first_name,
                &registration.last_name,
            ),
            access_token: Self::mint(DEV_TOKEN_PREFIX),
            refresh_token: Self::mint(DEV_REFRESH_PREFIX),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<String, AuthError> {
        Ok(Self::mint(DEV_TOKEN_PREFIX))
    }

    async fn logout(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn change_password(
        &self,
        _access_token: &str,
        _current: &str,
        _new: &str,
    ) -> Result<(), AuthError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// REST provider
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    customer: Profile,
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

fn map_auth_error(e: ApiError) -> AuthError {
    match e {
        ApiError::Status { status: 401, .. } => AuthError::InvalidCredentials,
        other => AuthError::Api(other),
    }
}

#[async_trait]
impl IdentityProvider for RestClient {
    async fn login(&self, email: &Email, password: &str) -> Result<IssuedSession, AuthError> {
        let request = LoginRequest {
            email: email.as_str(),
            password,
        };
        let response: SessionResponse = self
            .post_json("auth/login", &request, None)
            .await
            .map_err(map_auth_error)?;

        Ok(IssuedSession {
            profile: response.customer,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        })
    }

    async fn register(&self, registration: &Registration) -> Result<IssuedSession, AuthError> {
        let response: SessionResponse = self
            .post_json("auth/register", registration, None)
            .await
            .map_err(map_auth_error)?;

        Ok(IssuedSession {
            profile: response.customer,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let request = RefreshRequest { refresh_token };
        let response: RefreshResponse = self
            .post_json("auth/refresh", &request, None)
            .await
            .map_err(map_auth_error)?;

        Ok(response.access_token)
    }

    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        self.post_empty("auth/logout", &serde_json::json!({}), Some(access_token))
            .await
            .map_err(map_auth_error)
    }

    async fn change_password(
        &self,
        access_token: &str,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let request = ChangePasswordRequest {
            current_password: current,
            new_password: new,
        };
        self.post_empty("auth/change-password", &request, Some(access_token))
            .await
            .map_err(map_auth_error)
    }
}
