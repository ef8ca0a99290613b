//! Catalog subcommands.

use clap::Subcommand;

use tundra_client::{ClientError, Storefront};
use tundra_client::api::types::ProductDto;
use tundra_client::stores::StoreError;
use tundra_core::{CategoryId, ProductId};

use super::money;

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List every product
    List,
    /// Show one product
    Show {
        /// Product id
        product_id: i64,
    },
    /// Search the catalog
    Search {
        /// Search terms
        query: String,
    },
    /// List products in one category
    Category {
        /// Category id
        category_id: i64,
    },
    /// List the categories
    Categories,
}

fn print_products(products: &[ProductDto]) {
    for product in products {
        println!(
            "{:>4} {:<35} {:>12}  {}",
            product.id,
            product.name,
            money(product.price),
            product.category.as_deref().unwrap_or("-")
        );
    }
}

pub async fn run(storefront: &Storefront, action: ProductsAction) -> Result<(), ClientError> {
    let catalog = storefront.catalog();

    match action {
        ProductsAction::List => {
            let products = catalog.products().await?;
            print_products(&products);
        }
        ProductsAction::Show { product_id } => {
            let product_id = ProductId::new(product_id);
            let product = catalog
                .product(product_id)
                .await?
                .ok_or_else(|| {
                    ClientError::Store(StoreError::Invalid(format!(
                        "product {product_id} not found"
                    )))
                })?;

            println!("{} ({})", product.name, product.id);
            println!("price: {}", money(product.price));
            if let Some(category) = &product.category {
                println!("category: {category}");
            }
            if let Some(description) = &product.description {
                println!("{description}");
            }
        }
        ProductsAction::Search { query } => {
            let products = catalog.search(&query).await?;
            if products.is_empty() {
                println!("no products match {query:?}");
            } else {
                print_products(&products);
            }
        }
        ProductsAction::Category { category_id } => {
            let products = catalog.by_category(CategoryId::new(category_id)).await?;
            print_products(&products);
        }
        ProductsAction::Categories => {
            for category in catalog.categories().await? {
                println!("{:>4} {}", category.id, category.name);
            }
        }
    }
    Ok(())
}
