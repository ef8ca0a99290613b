//! Wishlist subcommands.

use clap::Subcommand;

use tundra_client::stores::StoreError;
use tundra_client::{ClientError, Storefront};
use tundra_core::ProductId;

use super::money;

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Save a product to the wishlist
    Add {
        /// Product id
        product_id: i64,
    },
    /// Remove a product from the wishlist
    Remove {
        /// Product id
        product_id: i64,
    },
    /// Move a saved product into the cart
    MoveToCart {
        /// Product id
        product_id: i64,
    },
    /// Remove every saved product
    Clear,
}

pub async fn run(storefront: &Storefront, action: WishlistAction) -> Result<(), ClientError> {
    let wishlist = storefront.wishlist();

    match action {
        WishlistAction::Show => {
            let items = wishlist.fetch_all().await?;
            if items.is_empty() {
                println!("wishlist is empty");
                return Ok(());
            }
            for item in &items {
                println!(
                    "{:>4} {:<30} {:>10}  added {}",
                    item.product_id,
                    item.name,
                    money(item.price),
                    item.added_at.format("%Y-%m-%d")
                );
            }
            let stats = wishlist.stats();
            println!(
                "{} products across {} categories, worth {}",
                stats.total,
                stats.categories,
                money(stats.total_value)
            );
        }
        WishlistAction::Add { product_id } => {
            let product_id = ProductId::new(product_id);
            let product = storefront
                .catalog()
                .product(product_id)
                .await
                .map_err(StoreError::from)?
                .ok_or_else(|| {
                    StoreError::Invalid(format!("product {product_id} not found"))
                })?;

            wishlist.fetch_all().await?;
            let item = wishlist.add_item(&product).await?;
            println!("saved {}", item.name);
        }
        WishlistAction::Remove { product_id } => {
            wishlist.fetch_all().await?;
            wishlist.remove_item(ProductId::new(product_id)).await?;
            println!("removed product {product_id}");
        }
        WishlistAction::MoveToCart { product_id } => {
            wishlist.fetch_all().await?;
            wishlist.move_to_cart(ProductId::new(product_id)).await?;
            storefront.cart().fetch_all().await?;
            println!("moved product {product_id} to cart");
        }
        WishlistAction::Clear => {
            wishlist.clear().await?;
            println!("wishlist cleared");
        }
    }
    Ok(())
}
