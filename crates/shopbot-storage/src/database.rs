// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Each query module call is its own atomic unit.

use std::path::Path;
use std::time::Duration;

use shopbot_core::ShopbotError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Convert a tokio-rusqlite call error into [`ShopbotError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ShopbotError {
    ShopbotError::Storage {
        source: Box::new(e),
    }
}

/// Current time in the RFC 3339 form stored in every timestamp column.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// A migrated SQLite database behind one tokio-rusqlite connection.
pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Open (creating if needed) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, ShopbotError> {
        Self::open_with_wal(path, true).await
    }

    /// Like [`Database::open`], with WAL mode selectable.
    pub async fn open_with_wal(path: &str, wal_mode: bool) -> Result<Self, ShopbotError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ShopbotError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| ShopbotError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(Duration::from_secs(5))?;
            if wal_mode {
                let _mode: String = conn.pragma_update_and_check(
                    None,
                    "journal_mode",
                    "WAL",
                    |row| row.get(0),
                )?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), ShopbotError> { crate::migrations::run_migrations(conn) })
            .await
            .map_err(|e| ShopbotError::Storage {
                source: e.to_string().into(),
            })?;

        debug!(path, wal_mode, "database opened and migrated");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Filesystem path this database was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), ShopbotError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), ShopbotError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(|e| ShopbotError::Storage {
            source: e.to_string().into(),
        })
    }
}
