//! Persisted OAuth credentials, one row per Discord user.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;
use zeitfrei_types::{UserCredential, UserId};

use crate::db::{Database, column_expiry, column_id};
use crate::error::Result;

const SELECT_USER: &str =
    "SELECT id, username, discriminator, access_token, refresh_token, expires_at FROM users";

/// Access to the `users` table.
#[derive(Debug, Clone)]
pub struct TokenStore {
    db: Database,
}

impl TokenStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Look up a user's credential.
    pub fn get(&self, user_id: UserId) -> Result<Option<UserCredential>> {
        let conn = self.db.conn();
        let cred = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_USER),
                params![user_id.to_string()],
                row_to_credential,
            )
            .optional()?;
        Ok(cred)
    }

    /// All stored credentials in insertion order.
    pub fn list(&self) -> Result<Vec<UserCredential>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!("{} ORDER BY rowid", SELECT_USER))?;
        let rows = stmt.query_map([], row_to_credential)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Insert or fully replace a credential (first login or re-authorization).
    pub fn upsert(&self, cred: &UserCredential) -> Result<()> {
        self.db.conn().execute(
            r#"
            INSERT INTO users (id, username, discriminator, access_token, refresh_token, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                discriminator = excluded.discriminator,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at
            "#,
            params![
                cred.user_id.to_string(),
                cred.username,
                cred.discriminator,
                cred.access_token,
                cred.refresh_token,
                cred.expires_at.to_rfc3339(),
            ],
        )?;
        debug!(user_id = %cred.user_id, "Stored credential");
        Ok(())
    }

    /// Overwrite the token pair after a refresh.
    ///
    /// Returns `false` if the user row no longer exists.
    pub fn update_tokens(
        &self,
        user_id: UserId,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let updated = self.db.conn().execute(
            "UPDATE users SET access_token = ?2, refresh_token = ?3, expires_at = ?4 WHERE id = ?1",
            params![
                user_id.to_string(),
                access_token,
                refresh_token,
                expires_at.to_rfc3339()
            ],
        )?;
        Ok(updated > 0)
    }

    /// Delete a user's credential. Returns `true` if a row was removed.
    pub fn delete(&self, user_id: UserId) -> Result<bool> {
        let deleted = self
            .db
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![user_id.to_string()])?;
        if deleted > 0 {
            debug!(user_id = %user_id, "Deleted credential");
        }
        Ok(deleted > 0)
    }
}

fn row_to_credential(row: &Row<'_>) -> rusqlite::Result<UserCredential> {
    Ok(UserCredential {
        user_id: column_id(row, 0)?,
        username: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        discriminator: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        access_token: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        refresh_token: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        expires_at: column_expiry(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> TokenStore {
        TokenStore::new(Database::open_in_memory().unwrap())
    }

    fn credential(id: u64, expires_at: DateTime<Utc>) -> UserCredential {
        UserCredential {
            user_id: UserId(id),
            username: format!("user{}", id),
            discriminator: "0".to_string(),
            access_token: format!("access-{}", id),
            refresh_token: format!("refresh-{}", id),
            expires_at,
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let store = store();
        let expires = Utc::now() + Duration::days(7);
        let cred = credential(1, expires);

        store.upsert(&cred).unwrap();
        let loaded = store.get(UserId(1)).unwrap().unwrap();

        assert_eq!(loaded.username, "user1");
        assert_eq!(loaded.access_token, "access-1");
        assert_eq!(loaded.expires_at.timestamp(), expires.timestamp());
        assert!(store.get(UserId(2)).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let store = store();
        store.upsert(&credential(1, Utc::now())).unwrap();

        let mut again = credential(1, Utc::now() + Duration::days(1));
        again.access_token = "reauthorized".to_string();
        store.upsert(&again).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].access_token, "reauthorized");
    }

    #[test]
    fn test_update_tokens() {
        let store = store();
        store.upsert(&credential(1, Utc::now())).unwrap();

        let later = Utc::now() + Duration::days(7);
        assert!(store.update_tokens(UserId(1), "a2", "r2", later).unwrap());
        assert!(!store.update_tokens(UserId(9), "a2", "r2", later).unwrap());

        let loaded = store.get(UserId(1)).unwrap().unwrap();
        assert_eq!(loaded.access_token, "a2");
        assert_eq!(loaded.refresh_token, "r2");
        assert_eq!(loaded.expires_at.timestamp(), later.timestamp());
    }

    #[test]
    fn test_delete() {
        let store = store();
        store.upsert(&credential(1, Utc::now())).unwrap();

        assert!(store.delete(UserId(1)).unwrap());
        assert!(!store.delete(UserId(1)).unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_row_without_expiry_reads_as_expired() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO users (id, username, discriminator, access_token, refresh_token) VALUES ('5', 'legacy', '1234', 'a', 'r')",
                [],
            )
            .unwrap();

        let cred = TokenStore::new(db).get(UserId(5)).unwrap().unwrap();
        assert_eq!(cred.expires_at, DateTime::UNIX_EPOCH);
        assert!(cred.is_stale_at(Utc::now()));
    }
}
