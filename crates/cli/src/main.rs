//! Tundra CLI - command-line driver for the storefront SDK.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the dev identity provider accepts any valid credentials)
//! tundra auth login -e user@example.com -p hunter22
//!
//! # Browse and shop
//! tundra products search "yoga"
//! tundra cart add 7 --quantity 2
//! tundra cart show
//!
//! # Check out the cart into an order
//! tundra orders place
//! tundra orders list
//! ```
//!
//! Configuration comes from `TUNDRA_*` environment variables (see the
//! client crate's `config` module); a `.env` file is honored.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tundra_client::config::ClientConfig;
use tundra_client::{ClientError, Storefront};

mod commands;

use commands::{auth, cart, orders, products, wishlist};

#[derive(Parser)]
#[command(name = "tundra")]
#[command(author, version, about = "Tundra storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the session
    Auth {
        #[command(subcommand)]
        action: auth::AuthAction,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        action: cart::CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: wishlist::WishlistAction,
    },
    /// Browse and manage orders
    Orders {
        #[command(subcommand)]
        action: orders::OrdersAction,
    },
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: products::ProductsAction,
    },
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = ClientConfig::from_env()?;
    let storefront = Storefront::new(config)?;

    match cli.command {
        Commands::Auth { action } => auth::run(&storefront, action).await,
        Commands::Cart { action } => cart::run(&storefront, action).await,
        Commands::Wishlist { action } => wishlist::run(&storefront, action).await,
        Commands::Orders { action } => orders::run(&storefront, action).await,
        Commands::Products { action } => products::run(&storefront, action).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
