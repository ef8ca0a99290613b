//! Top-level error type for SDK construction and orchestration.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::stores::StoreError;

/// Any error the SDK surface can produce.
///
/// Module-level errors stay typed at their seams; this enum exists for
/// callers (like the CLI) that funnel everything into one `Result`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration loading failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Local persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Transport-level API failure.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Authentication failure.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Domain store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_module_errors() {
        let err: ClientError = AuthError::NotAuthenticated.into();
        assert_eq!(err.to_string(), "auth error: authentication required");

        let err: ClientError = StoreError::AuthRequired.into();
        assert_eq!(err.to_string(), "store error: authentication required");
    }
}
