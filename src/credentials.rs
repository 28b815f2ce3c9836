// 🔐 Credential Store - user identities and password hashes
//
// Username and email are each unique (enforced by the store, not by a
// read-before-write). The hash is SHA-256 over salt || password with one
// process-wide salt.

use crate::db::{format_timestamp, is_constraint_violation, parse_timestamp, Store};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Registered account. `password_hash` never leaves the crate in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(4)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: parse_timestamp(4, &created_at)?,
        })
    }
}

pub struct CredentialStore {
    store: Store,
    salt: String,
}

impl CredentialStore {
    pub fn new(store: Store, salt: impl Into<String>) -> Self {
        CredentialStore {
            store,
            salt: salt.into(),
        }
    }

    /// Deterministic salted digest, lower-case hex.
    pub fn hash_password(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Create a new user. `Error::Conflict` if the username or email is taken.
    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        let conn = self.store.connect()?;
        let result = conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                username,
                email,
                self.hash_password(password),
                format_timestamp(Utc::now()),
            ],
        );

        match result {
            Ok(_) => {
                info!(username, "user registered");
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => {
                debug!(username, "registration rejected: username or email in use");
                Err(Error::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// False for unknown usernames as well as wrong passwords.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let conn = self.store.connect()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()?;

        let ok = match stored {
            Some(hash) => hash == self.hash_password(password),
            None => false,
        };
        if !ok {
            warn!(username, "authentication failed");
        }
        Ok(ok)
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        let conn = self.store.connect()?;
        let user = conn
            .query_row(
                "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
                [username],
                User::from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// The only identity check before a reset: both fields must match exactly.
    pub fn lookup_for_reset(&self, username: &str, email: &str) -> Result<Option<User>> {
        let conn = self.store.connect()?;
        let user = conn
            .query_row(
                "SELECT id, username, email, password_hash, created_at
                 FROM users
                 WHERE username = ?1 AND email = ?2",
                params![username, email],
                User::from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Overwrites the hash unconditionally. Callers verify identity first
    /// with [`CredentialStore::lookup_for_reset`].
    pub fn reset_password(&self, username: &str, new_password: &str) -> Result<()> {
        let conn = self.store.connect()?;
        let updated = conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE username = ?2",
            params![self.hash_password(new_password), username],
        )?;
        info!(username, updated, "password reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, CredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("users.db")).unwrap();
        (dir, CredentialStore::new(store, "test_salt"))
    }

    #[test]
    fn test_register_then_authenticate() {
        let (_dir, creds) = create_test_store();

        creds.register("alice", "a@x.com", "pw1").unwrap();

        assert!(creds.authenticate("alice", "pw1").unwrap());
        assert!(!creds.authenticate("alice", "pw2").unwrap());
        assert!(!creds.authenticate("bob", "pw1").unwrap());
    }

    #[test]
    fn test_duplicate_username_conflicts_and_keeps_hash() {
        let (_dir, creds) = create_test_store();

        creds.register("alice", "a@x.com", "pw1").unwrap();
        let before = creds.find_user("alice").unwrap().unwrap().password_hash;

        let err = creds.register("alice", "other@x.com", "pw2").unwrap_err();
        assert!(matches!(err, Error::Conflict));

        let after = creds.find_user("alice").unwrap().unwrap().password_hash;
        assert_eq!(before, after);
        assert!(creds.authenticate("alice", "pw1").unwrap());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let (_dir, creds) = create_test_store();

        creds.register("alice", "a@x.com", "pw1").unwrap();
        let err = creds.register("alicia", "a@x.com", "pw1").unwrap_err();
        assert!(matches!(err, Error::Conflict));
        assert!(creds.find_user("alicia").unwrap().is_none());
    }

    #[test]
    fn test_hash_is_deterministic_hex() {
        let (_dir, creds) = create_test_store();

        let h1 = creds.hash_password("secret");
        let h2 = creds.hash_password("secret");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64, "SHA-256 hash should be 64 hex characters");
        assert_ne!(h1, creds.hash_password("secret2"));

        let other_salt = CredentialStore::new(Store::new("unused.db"), "another_salt");
        assert_ne!(h1, other_salt.hash_password("secret"));
    }

    #[test]
    fn test_stored_hash_is_not_raw_password() {
        let (_dir, creds) = create_test_store();

        creds.register("alice", "a@x.com", "pw1").unwrap();
        let user = creds.find_user("alice").unwrap().unwrap();
        assert_ne!(user.password_hash, "pw1");
        assert_eq!(user.password_hash, creds.hash_password("pw1"));
    }

    #[test]
    fn test_lookup_for_reset_requires_both_fields() {
        let (_dir, creds) = create_test_store();
        creds.register("alice", "a@x.com", "pw1").unwrap();

        assert!(creds.lookup_for_reset("alice", "a@x.com").unwrap().is_some());
        assert!(creds.lookup_for_reset("alice", "b@x.com").unwrap().is_none());
        assert!(creds.lookup_for_reset("bob", "a@x.com").unwrap().is_none());
    }

    #[test]
    fn test_reset_password_replaces_old() {
        let (_dir, creds) = create_test_store();
        creds.register("alice", "a@x.com", "pw1").unwrap();

        creds.reset_password("alice", "pw-new").unwrap();

        assert!(creds.authenticate("alice", "pw-new").unwrap());
        assert!(!creds.authenticate("alice", "pw1").unwrap());
    }

    #[test]
    fn test_user_serialization_omits_hash() {
        let (_dir, creds) = create_test_store();
        creds.register("alice", "a@x.com", "pw1").unwrap();

        let user = creds.find_user("alice").unwrap().unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
