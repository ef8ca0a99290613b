//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password missing from the submitted credentials.
    #[error("email and password are required")]
    MissingCredentials,

    /// Email failed structural validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tundra_core::EmailError),

    /// Password shorter than the minimum length.
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum accepted password length.
        min: usize,
    },

    /// The identity provider rejected the credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Operation requires an authenticated session.
    #[error("authentication required")]
    NotAuthenticated,

    /// No refresh token is available for a refresh attempt.
    #[error("no refresh token available")]
    RefreshUnavailable,

    /// Identity provider call failed at the transport level.
    #[error("identity provider error: {0}")]
    Api(#[from] ApiError),

    /// Local persistence failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
