// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product catalog queries.

use rusqlite::{OptionalExtension, params};
use shopbot_core::{Product, ShopbotError};

use crate::database::{Database, map_tr_err};

/// Exact-name lookup.
pub async fn find(db: &Database, name: &str) -> Result<Option<Product>, ShopbotError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT name, description, price FROM products WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Product {
                        name: row.get(0)?,
                        description: row.get(1)?,
                        unit_price: row.get(2)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a product or replace the description and price of an existing one.
pub async fn upsert(db: &Database, product: &Product) -> Result<(), ShopbotError> {
    if product.name.trim().is_empty() || product.name.chars().any(char::is_whitespace) {
        return Err(ShopbotError::InvalidInput(format!(
            "product name `{}` must be a single non-empty word",
            product.name
        )));
    }
    if !product.unit_price.is_finite() || product.unit_price < 0.0 {
        return Err(ShopbotError::InvalidInput(format!(
            "price must be a non-negative number, got {}",
            product.unit_price
        )));
    }

    let product = product.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO products (name, description, price) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET
                     description = excluded.description,
                     price = excluded.price",
                params![product.name, product.description, product.unit_price],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All products ordered by name.
pub async fn list(db: &Database) -> Result<Vec<Product>, ShopbotError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT name, description, price FROM products ORDER BY name")?;
            let rows = stmt.query_map([], |row| {
                Ok(Product {
                    name: row.get(0)?,
                    description: row.get(1)?,
                    unit_price: row.get(2)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn widget() -> Product {
        Product {
            name: "Widget".into(),
            description: "A widget".into(),
            unit_price: 9.99,
        }
    }

    #[tokio::test]
    async fn find_is_exact_match() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("p.db").to_str().unwrap())
            .await
            .unwrap();
        upsert(&db, &widget()).await.unwrap();

        assert_eq!(find(&db, "Widget").await.unwrap(), Some(widget()));
        assert_eq!(find(&db, "widget").await.unwrap(), None);
        assert_eq!(find(&db, "Gadget").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_replaces_price() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("p.db").to_str().unwrap())
            .await
            .unwrap();
        upsert(&db, &widget()).await.unwrap();
        let mut cheaper = widget();
        cheaper.unit_price = 4.5;
        upsert(&db, &cheaper).await.unwrap();

        let all = list(&db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].unit_price, 4.5);
    }

    #[tokio::test]
    async fn upsert_rejects_multi_word_names() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("p.db").to_str().unwrap())
            .await
            .unwrap();
        let mut bad = widget();
        bad.name = "Blue Widget".into();
        let err = upsert(&db, &bad).await.unwrap_err();
        assert!(matches!(err, ShopbotError::InvalidInput(_)));
    }
}
