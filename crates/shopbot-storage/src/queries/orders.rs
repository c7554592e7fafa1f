// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order ledger queries. Orders are written once and never updated.

use rusqlite::params;
use shopbot_core::{Order, ShopbotError, UserId};

use crate::database::{Database, map_tr_err, now_timestamp};

/// Record an order and return the id SQLite assigned to it.
pub async fn record(
    db: &Database,
    user_id: UserId,
    product_name: &str,
    quantity: u32,
    unit_cost: f64,
) -> Result<i64, ShopbotError> {
    if quantity == 0 {
        return Err(ShopbotError::InvalidInput(
            "order quantity must be at least 1".to_string(),
        ));
    }

    let product_name = product_name.to_string();
    let total_cost = unit_cost * f64::from(quantity);
    let order_date = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO orders (user_id, product_name, quantity, unit_cost, total_cost, order_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![user_id.0, product_name, quantity, unit_cost, total_cost, order_date],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// All orders placed by a user, oldest first.
pub async fn for_user(db: &Database, user_id: UserId) -> Result<Vec<Order>, ShopbotError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT order_id, user_id, product_name, quantity, unit_cost, total_cost, order_date
                 FROM orders WHERE user_id = ?1 ORDER BY order_id",
            )?;
            let rows = stmt.query_map(params![user_id.0], |row| {
                Ok(Order {
                    order_id: row.get(0)?,
                    user_id: UserId(row.get(1)?),
                    product_name: row.get(2)?,
                    quantity: row.get(3)?,
                    unit_cost: row.get(4)?,
                    total_cost: row.get(5)?,
                    created_at: row.get(6)?,
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
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn record_computes_total() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("o.db").to_str().unwrap())
            .await
            .unwrap();
        let id = record(&db, UserId(3), "Widget", 2, 9.99).await.unwrap();

        let orders = for_user(&db, UserId(3)).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id, id);
        assert_eq!(orders[0].quantity, 2);
        assert!((orders[0].total_cost - 19.98).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("o.db").to_str().unwrap())
            .await
            .unwrap();
        assert!(record(&db, UserId(3), "Widget", 0, 1.0).await.is_err());
        assert!(for_user(&db, UserId(3)).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_get_distinct_ids() {
        let dir = tempdir().unwrap();
        let db = Arc::new(
            Database::open(dir.path().join("o.db").to_str().unwrap())
                .await
                .unwrap(),
        );

        let tasks = (0..16).map(|i| {
            let db = Arc::clone(&db);
            tokio::spawn(async move { record(&db, UserId(i % 3), "Widget", 1, 9.99).await })
        });
        let mut ids: Vec<i64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }
}
