//! Order subcommands.

use clap::Subcommand;

use tundra_client::stores::{OrderDraft, OrderLine, StoreError};
use tundra_client::{ClientError, Storefront};
use tundra_core::{OrderId, OrderStatus};

use super::money;

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List the order history
    List,
    /// Show one order
    Show {
        /// Order id
        order_id: String,
    },
    /// Place an order from the current cart
    Place,
    /// Cancel an order
    Cancel {
        /// Order id
        order_id: String,
    },
    /// Set an order's status
    SetStatus {
        /// Order id
        order_id: String,

        /// New status (pending, processing, shipped, delivered, cancelled)
        status: OrderStatus,
    },
}

pub async fn run(storefront: &Storefront, action: OrdersAction) -> Result<(), ClientError> {
    let orders = storefront.orders();

    match action {
        OrdersAction::List => {
            let history = orders.fetch_all().await?;
            if history.is_empty() {
                println!("no orders yet");
                return Ok(());
            }
            for order in &history {
                println!(
                    "{:<40} {} {:<10} {:>12}",
                    order.id,
                    order.placed_at,
                    order.status.to_string(),
                    money(order.total)
                );
            }
        }
        OrdersAction::Show { order_id } => {
            orders.fetch_all().await?;
            let order = orders.fetch_by_id(&OrderId::from_string(order_id)).await?;
            println!("{} placed {} [{}]", order.id, order.placed_at, order.status);
            for line in &order.items {
                println!(
                    "  {:>4} x{:<3} {:<30} {:>10}",
                    line.product_id,
                    line.quantity,
                    line.name,
                    money(line.line_total())
                );
            }
            println!("total: {}", money(order.total));
        }
        OrdersAction::Place => {
            let cart = storefront.cart();
            let items = cart.fetch_all().await?;
            if items.is_empty() {
                return Err(StoreError::Invalid("cart is empty".to_owned()).into());
            }

            let draft = OrderDraft {
                items: items
                    .iter()
                    .map(|item| OrderLine {
                        product_id: item.product_id,
                        name: item.name.clone(),
                        quantity: item.quantity,
                        price: item.price,
                    })
                    .collect(),
                total: None,
            };
            let order = orders.create(draft).await?;
            cart.clear().await?;
            println!("placed {} for {}", order.id, money(order.total));
        }
        OrdersAction::Cancel { order_id } => {
            orders.fetch_all().await?;
            let id = OrderId::from_string(order_id);
            orders.cancel(&id).await?;
            println!("cancelled {id}");
        }
        OrdersAction::SetStatus { order_id, status } => {
            orders.fetch_all().await?;
            let id = OrderId::from_string(order_id);
            orders.update_status(&id, status).await?;
            println!("{id} is now {status}");
        }
    }
    Ok(())
}
