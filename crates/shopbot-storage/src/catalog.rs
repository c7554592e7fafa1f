// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product catalog backed by its own SQLite connection.
//!
//! The catalog may share the main database file or live in a separate one;
//! either way it gets its own connection so lookups never queue behind
//! history writes.

use async_trait::async_trait;
use shopbot_core::{Catalog, Product, ShopbotError};

use crate::database::Database;
use crate::queries;

/// Read path for the pipeline plus maintenance operations for the CLI.
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    /// Open the catalog database at `path`, creating the schema if needed.
    pub async fn open(path: &str) -> Result<Self, ShopbotError> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    /// Add a product or update an existing one.
    pub async fn upsert(&self, product: &Product) -> Result<(), ShopbotError> {
        queries::products::upsert(&self.db, product).await
    }

    pub async fn list(&self) -> Result<Vec<Product>, ShopbotError> {
        queries::products::list(&self.db).await
    }

    pub async fn close(self) -> Result<(), ShopbotError> {
        self.db.close().await
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn find(&self, name: &str) -> Result<Option<Product>, ShopbotError> {
        queries::products::find(&self.db, name).await
    }
}
