// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history: append-only, read back as a bounded window.

use rusqlite::params;
use shopbot_core::{Role, ShopbotError, StoredMessage, UserId};

use crate::database::{Database, map_tr_err, now_timestamp};

/// Insert one message and return the stored record.
pub async fn append(
    db: &Database,
    user_id: UserId,
    role: Role,
    content: &str,
) -> Result<StoredMessage, ShopbotError> {
    if content.trim().is_empty() {
        return Err(ShopbotError::InvalidInput(
            "message content must not be empty".to_string(),
        ));
    }

    let content = content.to_string();
    let created_at = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_history (user_id, role, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id.0, role.to_string(), content, created_at],
            )?;
            Ok(StoredMessage {
                id: conn.last_insert_rowid(),
                user_id,
                role,
                content,
                created_at,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` most recent messages for `user_id`, oldest first.
pub async fn recent(
    db: &Database,
    user_id: UserId,
    limit: usize,
) -> Result<Vec<StoredMessage>, ShopbotError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, role, content, timestamp
                 FROM chat_history WHERE user_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id.0, limit], |row| {
                let role: String = row.get(2)?;
                let role = role.parse::<Role>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(StoredMessage {
                    id: row.get(0)?,
                    user_id: UserId(row.get(1)?),
                    role,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of messages stored for a user.
pub async fn count(db: &Database, user_id: UserId) -> Result<i64, ShopbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM chat_history WHERE user_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let (db, _dir) = setup_db().await;
        let a = append(&db, UserId(1), Role::User, "hello").await.unwrap();
        let b = append(&db, UserId(1), Role::Assistant, "hi").await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(b.role, Role::Assistant);
        assert!(a.created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let (db, _dir) = setup_db().await;
        let err = append(&db, UserId(1), Role::User, "   ").await.unwrap_err();
        assert!(matches!(err, ShopbotError::InvalidInput(_)));
        assert_eq!(count(&db, UserId(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recent_returns_tail_in_chronological_order() {
        let (db, _dir) = setup_db().await;
        for i in 0..15 {
            append(&db, UserId(7), Role::User, &format!("m{i}"))
                .await
                .unwrap();
        }
        let window = recent(&db, UserId(7), 10).await.unwrap();
        let contents: Vec<_> = window.iter().map(|m| m.content.as_str()).collect();
        let expected: Vec<String> = (5..15).map(|i| format!("m{i}")).collect();
        assert_eq!(contents, expected);
    }

    #[tokio::test]
    async fn recent_is_scoped_per_user() {
        let (db, _dir) = setup_db().await;
        append(&db, UserId(1), Role::User, "mine").await.unwrap();
        append(&db, UserId(2), Role::User, "theirs").await.unwrap();
        let window = recent(&db, UserId(1), 10).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].content, "mine");
        assert!(recent(&db, UserId(3), 10).await.unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn window_is_min_of_count_and_limit(n in 0usize..25, limit in 1usize..15) {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let (db, _dir) = setup_db().await;
                for i in 0..n {
                    append(&db, UserId(9), Role::User, &format!("{i}")).await.unwrap();
                }
                let window = recent(&db, UserId(9), limit).await.unwrap();
                assert_eq!(window.len(), n.min(limit));
                let ids: Vec<i64> = window.iter().map(|m| m.id).collect();
                let mut sorted = ids.clone();
                sorted.sort();
                assert_eq!(ids, sorted);
                if let Some(last) = window.last() {
                    assert_eq!(last.content, format!("{}", n - 1));
                }
            });
        }
    }
}
