use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier as _, Version,
    password_hash::SaltString,
};
use libsql::Connection;
use rand::RngCore;
use std::sync::Arc;

use crate::config;
use crate::model::User;

const SALT_SIZE: usize = 16;
const DECOY_PASSWORD: &str = "linkdeck-decoy-password";

/// Argon2id hashing, run on the blocking pool since each call is
/// deliberately slow.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash checked against when the username is unknown, so that path
    /// costs the same as a wrong password.
    decoy_hash: Arc<str>,
    #[cfg(test)]
    verifications: Arc<std::sync::atomic::AtomicUsize>,
}

impl PasswordHasher {
    pub fn new(cost: config::PasswordHash) -> Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::encode_b64(&[0u8; SALT_SIZE]).map_err(|e| anyhow::anyhow!("invalid salt: {e}"))?;
        let decoy_hash = argon2
            .hash_password(DECOY_PASSWORD.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("failed to hash decoy password: {e}"))?
            .to_string();

        Ok(PasswordHasher {
            argon2,
            decoy_hash: decoy_hash.into(),
            #[cfg(test)]
            verifications: Arc::default(),
        })
    }

    pub async fn hash(&self, plaintext: &str) -> Result<String> {
        let argon2 = self.argon2.clone();
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || -> Result<String> {
            let mut salt = [0u8; SALT_SIZE];
            rand::thread_rng().fill_bytes(&mut salt);
            let salt = SaltString::encode_b64(&salt).map_err(|e| anyhow::anyhow!("invalid salt: {e}"))?;

            let hash = argon2
                .hash_password(plaintext.as_bytes(), &salt)
                .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
            Ok(hash.to_string())
        })
        .await?
    }

    /// False for a mismatch and for a stored hash that cannot be parsed.
    pub async fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool> {
        #[cfg(test)]
        self.verifications.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let argon2 = self.argon2.clone();
        let plaintext = plaintext.to_owned();
        let stored_hash = stored_hash.to_owned();

        let matches = tokio::task::spawn_blocking(move || match PasswordHash::new(&stored_hash) {
            Ok(parsed) => argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!("stored password hash is unreadable: {}", e);
                false
            }
        })
        .await?;

        Ok(matches)
    }
}

pub struct Credentials<'a> {
    conn: &'a Connection,
    hasher: &'a PasswordHasher,
}

impl<'a> Credentials<'a> {
    pub fn new(conn: &'a Connection, hasher: &'a PasswordHasher) -> Self {
        Self { conn, hasher }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = r#"
            SELECT id, username, password, created_at, updated_at
            FROM users WHERE username = ?
        "#;

        let mut rows = self.conn.query(query, libsql::params![username]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let query = r#"
            SELECT id, username, password, created_at, updated_at
            FROM users WHERE id = ?
        "#;

        let mut rows = self.conn.query(query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Returns the user only when the password matches. An unknown username
    /// and a wrong password are indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, plaintext: &str) -> Result<Option<User>> {
        let Some(user) = self.find_by_username(username).await? else {
            self.hasher.verify(plaintext, &self.hasher.decoy_hash).await?;
            return Ok(None);
        };

        if self.hasher.verify(plaintext, &user.password_hash).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn verify(&self, username: &str, plaintext: &str) -> Result<bool> {
        Ok(self.authenticate(username, plaintext).await?.is_some())
    }

    /// Overwrites the stored hash. Callers must have checked the old password.
    pub async fn update_password(&self, user_id: i64, new_plaintext: &str) -> Result<bool> {
        let hash = self.hasher.hash(new_plaintext).await?;
        let updated = self
            .conn
            .execute(
                "UPDATE users SET password = ?, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
                libsql::params![hash, user_id],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Seeds the administrator account on first start. Refuses to invent a
    /// password when none is configured.
    pub async fn ensure_admin(&self, username: &str, password: Option<&str>) -> Result<bool> {
        if self.find_by_username(username).await?.is_some() {
            return Ok(false);
        }

        let Some(password) = password else {
            anyhow::bail!(
                "user '{username}' does not exist and no admin password is configured \
                 (set auth.admin_password or LINKDECK_ADMIN_PASSWORD)"
            );
        };

        let hash = self.hasher.hash(password).await?;
        self.conn
            .execute(
                "INSERT INTO users (username, password) VALUES (?, ?)",
                libsql::params![username, hash],
            )
            .await?;
        tracing::info!(username = %username, "created admin user");
        Ok(true)
    }

    fn row_to_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}
