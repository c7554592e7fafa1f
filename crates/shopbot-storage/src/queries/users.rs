// SPDX-FileCopyrightText: 2026 Shopbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User directory queries.

use rusqlite::{OptionalExtension, params};
use shopbot_core::{Language, ShopbotError, User, UserId};

use crate::database::{Database, map_tr_err, now_timestamp};

fn parse_language(idx: usize, value: Option<String>) -> rusqlite::Result<Option<Language>> {
    value
        .map(|code| {
            code.parse::<Language>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
}

pub async fn exists(db: &Database, user_id: UserId) -> Result<bool, ShopbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE telegram_id = ?1)",
                params![user_id.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a new user. An existing id yields [`ShopbotError::Conflict`].
pub async fn create(
    db: &Database,
    user_id: UserId,
    display_name: Option<&str>,
) -> Result<(), ShopbotError> {
    let name = display_name.map(str::to_string);
    let created_at = now_timestamp();
    let inserted = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (telegram_id, name, created_at) VALUES (?1, ?2, ?3)",
                params![user_id.0, name, created_at],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if inserted == 0 {
        return Err(ShopbotError::Conflict {
            entity: "user".to_string(),
            key: user_id.to_string(),
        });
    }
    Ok(())
}

pub async fn get(db: &Database, user_id: UserId) -> Result<Option<User>, ShopbotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT telegram_id, name, language, created_at FROM users WHERE telegram_id = ?1",
                params![user_id.0],
                |row| {
                    Ok(User {
                        id: UserId(row.get(0)?),
                        display_name: row.get(1)?,
                        language: parse_language(2, row.get(2)?)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Store the user's language, registering the user if they are not known yet.
pub async fn set_language(
    db: &Database,
    user_id: UserId,
    language: Language,
) -> Result<(), ShopbotError> {
    let created_at = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (telegram_id, language, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(telegram_id) DO UPDATE SET language = excluded.language",
                params![user_id.0, language.code(), created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_language(
    db: &Database,
    user_id: UserId,
) -> Result<Option<Language>, ShopbotError> {
    let stored: Option<Option<String>> = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT language FROM users WHERE telegram_id = ?1",
                params![user_id.0],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    parse_language(0, stored.flatten()).map_err(|e| ShopbotError::Storage {
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("users.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_then_exists() {
        let (db, _dir) = setup_db().await;
        assert!(!exists(&db, UserId(1)).await.unwrap());
        create(&db, UserId(1), Some("Ann")).await.unwrap();
        assert!(exists(&db, UserId(1)).await.unwrap());

        let user = get(&db, UserId(1)).await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ann"));
        assert_eq!(user.language, None);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let (db, _dir) = setup_db().await;
        create(&db, UserId(1), None).await.unwrap();
        let err = create(&db, UserId(1), Some("Other")).await.unwrap_err();
        assert!(err.is_conflict());
        let user = get(&db, UserId(1)).await.unwrap().unwrap();
        assert_eq!(user.display_name, None);
    }

    #[tokio::test]
    async fn language_is_updated_in_place() {
        let (db, _dir) = setup_db().await;
        create(&db, UserId(5), None).await.unwrap();
        assert_eq!(get_language(&db, UserId(5)).await.unwrap(), None);

        set_language(&db, UserId(5), Language::Ru).await.unwrap();
        assert_eq!(get_language(&db, UserId(5)).await.unwrap(), Some(Language::Ru));

        set_language(&db, UserId(5), Language::En).await.unwrap();
        assert_eq!(get_language(&db, UserId(5)).await.unwrap(), Some(Language::En));
    }

    #[tokio::test]
    async fn unknown_user_has_no_language() {
        let (db, _dir) = setup_db().await;
        assert_eq!(get_language(&db, UserId(404)).await.unwrap(), None);
        assert!(get(&db, UserId(404)).await.unwrap().is_none());
    }
}
