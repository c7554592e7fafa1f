// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog and order maintenance commands.

use shopbot_config::ShopbotConfig;
use shopbot_core::{Product, ShopbotError, StorageAdapter, UserId};
use shopbot_storage::{SqliteCatalog, SqliteStorage};

/// `shopbot catalog add`
pub async fn add_product(
    config: &ShopbotConfig,
    name: String,
    description: String,
    price: f64,
) -> Result<(), ShopbotError> {
    let catalog = SqliteCatalog::open(config.storage.catalog_database()).await?;
    let product = Product {
        name,
        description,
        unit_price: price,
    };
    catalog.upsert(&product).await?;
    println!("saved {} ({:.2})", product.name, product.unit_price);
    catalog.close().await
}

/// `shopbot catalog list`
pub async fn list_products(config: &ShopbotConfig) -> Result<(), ShopbotError> {
    let catalog = SqliteCatalog::open(config.storage.catalog_database()).await?;
    let products = catalog.list().await?;
    if products.is_empty() {
        println!("catalog is empty");
    }
    for p in &products {
        println!("{:<24} {:>10.2}  {}", p.name, p.unit_price, p.description);
    }
    catalog.close().await
}

/// `shopbot orders --user <id>`
pub async fn list_orders(config: &ShopbotConfig, user: i64) -> Result<(), ShopbotError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let orders = storage.orders_for_user(UserId(user)).await?;
    if orders.is_empty() {
        println!("no orders for user {user}");
    }
    for o in &orders {
        println!(
            "#{:<6} {}  {} x{} @ {:.2} = {:.2}",
            o.order_id, o.created_at, o.product_name, o.quantity, o.unit_cost, o.total_cost
        );
    }
    storage.close().await
}
