//! Tundra storefront client SDK.
//!
//! A headless client for the Tundra storefront REST backend. The SDK owns
//! the client-side session and shopping state and keeps it reconciled with
//! the remote API:
//!
//! - [`auth::SessionManager`] - token lifecycle (login, refresh, logout)
//! - [`stores::CartStore`] - shopping cart with guest-mode local persistence
//! - [`stores::WishlistStore`] - saved-for-later product list
//! - [`stores::OrdersStore`] - order history and order placement
//! - [`catalog::CatalogClient`] - cached read-only product catalog
//!
//! All remote access goes through the per-resource traits in [`api`], and
//! token issuance sits behind [`auth::IdentityProvider`], so both can be
//! substituted without touching the stores.
//!
//! # Example
//!
//! ```rust,ignore
//! use tundra_client::{Storefront, auth::Credentials, config::ClientConfig};
//!
//! let config = ClientConfig::from_env()?;
//! let store = Storefront::new(config)?;
//!
//! store.login(Credentials::new("user@example.com", "hunter22")).await?;
//! store.cart().add_item(product.into(), 1).await?;
//! println!("{} items in cart", store.cart().count());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod storage;
pub mod storefront;
pub mod stores;

pub use error::ClientError;
pub use storefront::Storefront;
