use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::{info, warn};

use super::model::*;
use super::repo::*;
use super::sqlite::{hash_password, is_unique_violation, open_pool, verify_password, DUMMY_PASSWORD};

/// Admin credentials (admin.db), kept apart from end-user accounts.
pub struct AdminStore {
    pool: SqlitePool,
    bcrypt_cost: u32,
    dummy_hash: String,
}

impl AdminStore {
    pub async fn new(db_path: &str, bcrypt_cost: u32) -> DbResult<Self> {
        let pool = open_pool(db_path, include_str!("admin.sql")).await?;
        let dummy_hash = hash_password(DUMMY_PASSWORD, bcrypt_cost)?;
        Ok(Self {
            pool,
            bcrypt_cost,
            dummy_hash,
        })
    }

    /// Create the bootstrap account. An existing account of the same name is
    /// left untouched.
    pub async fn seed_admin(&self, username: &str, password: &str) -> DbResult<()> {
        match self.add_admin(username, password).await {
            Ok(()) => Ok(()),
            Err(DbError::AlreadyExists(_)) => {
                warn!("Admin user {} already exists", username);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AdminRepo for AdminStore {
    async fn add_admin(&self, username: &str, password: &str) -> DbResult<()> {
        let hashed = hash_password(password, self.bcrypt_cost)?;

        sqlx::query("INSERT INTO admin_users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(&hashed)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::AlreadyExists(format!("Admin {}", username))
                } else {
                    DbError::Sqlx(e)
                }
            })?;

        info!("Admin user {} added", username);
        Ok(())
    }

    async fn login_admin(&self, username: &str, password: &str) -> DbResult<AdminUser> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT id, username, password FROM admin_users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match admin {
            Some(admin) => {
                if verify_password(password, &admin.password_hash)? {
                    Ok(admin)
                } else {
                    Err(DbError::InvalidCredentials)
                }
            }
            None => {
                verify_password(password, &self.dummy_hash)?;
                Err(DbError::InvalidCredentials)
            }
        }
    }
}
