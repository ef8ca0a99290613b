//! Cart subcommands.

use clap::Subcommand;

use tundra_client::stores::{CartProduct, StoreError};
use tundra_client::{ClientError, Storefront};
use tundra_core::ProductId;

use super::money;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart contents
    Show,
    /// Add a product to the cart
    Add {
        /// Product id
        product_id: i64,

        /// Number of units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        product_id: i64,
    },
    /// Set a cart line's quantity (0 removes the line)
    SetQty {
        /// Product id
        product_id: i64,

        /// New quantity
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

pub async fn run(storefront: &Storefront, action: CartAction) -> Result<(), ClientError> {
    let cart = storefront.cart();

    match action {
        CartAction::Show => {
            let items = cart.fetch_all().await?;
            if items.is_empty() {
                println!("cart is empty");
                return Ok(());
            }
            for item in &items {
                println!(
                    "{:>4} x{:<3} {:<30} {:>10}",
                    item.product_id,
                    item.quantity,
                    item.name,
                    money(item.line_total())
                );
            }
            println!("total: {} ({} items)", money(cart.total()), cart.count());
        }
        CartAction::Add {
            product_id,
            quantity,
        } => {
            let product_id = ProductId::new(product_id);
            let product = storefront
                .catalog()
                .product(product_id)
                .await
                .map_err(StoreError::from)?
                .ok_or_else(|| {
                    StoreError::Invalid(format!("product {product_id} not found"))
                })?;

            cart.add_item(CartProduct::from(&product), quantity).await?;
            println!("added {} x{quantity}", product.name);
        }
        CartAction::Remove { product_id } => {
            cart.fetch_all().await?;
            cart.remove_item(ProductId::new(product_id)).await?;
            println!("removed product {product_id}");
        }
        CartAction::SetQty {
            product_id,
            quantity,
        } => {
            cart.fetch_all().await?;
            cart.update_quantity(ProductId::new(product_id), quantity)
                .await?;
            println!("updated product {product_id}");
        }
        CartAction::Clear => {
            cart.clear().await?;
            println!("cart cleared");
        }
    }
    Ok(())
}
