//! Remote storefront REST API client.
//!
//! # Architecture
//!
//! - One stateless request function per resource operation, grouped into
//!   per-resource traits ([`CartApi`], [`WishlistApi`], [`OrdersApi`],
//!   [`CatalogApi`]) so stores depend on the contract, not the transport
//! - [`RestClient`] implements every trait over `reqwest`
//! - Bearer token passed per call; no ambient authentication state
//! - No retries, no backoff, no circuit breaking: failures surface to the
//!   calling store, which records them and leaves refetch to the caller
//!
//! # Example
//!
//! ```rust,ignore
//! use tundra_client::api::{CartApi, RestClient};
//!
//! let client = RestClient::new(&config)?;
//! let cart = client.fetch(customer_id, token).await?;
//! ```

mod carts;
mod catalog;
mod orders;
pub mod types;
mod wishlist;

pub use carts::CartApi;
pub use catalog::CatalogApi;
pub use orders::OrdersApi;
pub use wishlist::WishlistApi;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;

/// Errors that can occur when calling the storefront REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or the canonical reason phrase.
        message: String,
    },

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this error is a 404 response.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Error body shape the backend uses for non-success responses.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for the storefront REST backend.
///
/// Cheaply cloneable; all per-resource traits in this module are
/// implemented on it.
#[derive(Debug, Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

#[derive(Debug)]
struct RestClientInner {
    http: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RestClientInner {
                http,
                base_url: config.api_base_url.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{path}",
            self.inner.base_url.as_str().trim_end_matches('/')
        )
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let mut request = self.inner.http.request(method, self.endpoint(path));

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        Ok(response.json().await?)
    }

    /// Same as [`request`](Self::request) but discards the response body,
    /// for endpoints that answer 204 or an uninteresting echo.
    async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<&(impl Serialize + Sync)>,
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut request = self.inner.http.request(method, self.endpoint(path));

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        Ok(())
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>, token).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub(crate) async fn post_empty(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.request_empty(Method::POST, path, Some(body), token)
            .await
    }

    pub(crate) async fn put_empty(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.request_empty(Method::PUT, path, Some(body), token)
            .await
    }

    pub(crate) async fn patch_empty(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.request_empty(Method::PATCH, path, Some(body), token)
            .await
    }

    pub(crate) async fn delete_empty(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.request_empty(Method::DELETE, path, None::<&()>, token)
            .await
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> ApiError {
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_owned(),
    };

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = ApiError::Status {
            status: 404,
            message: "Not Found".to_owned(),
        };
        assert!(err.is_not_found());

        let err = ApiError::Status {
            status: 500,
            message: "Internal Server Error".to_owned(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 401,
            message: "Unauthorized".to_owned(),
        };
        assert_eq!(err.to_string(), "HTTP 401: Unauthorized");
    }
}
