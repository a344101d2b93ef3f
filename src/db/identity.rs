use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use super::model::*;
use super::repo::*;
use super::sqlite::{
    hash_password, is_unique_violation, not_found, open_pool, verify_password, DUMMY_PASSWORD,
};

/// Users and their product ratings (main.db).
pub struct IdentityStore {
    pool: SqlitePool,
    bcrypt_cost: u32,
    // Checked against on unknown usernames so both login failures cost a
    // bcrypt verify.
    dummy_hash: String,
}

impl IdentityStore {
    pub async fn new(db_path: &str, bcrypt_cost: u32) -> DbResult<Self> {
        let pool = open_pool(db_path, include_str!("identity.sql")).await?;
        let dummy_hash = hash_password(DUMMY_PASSWORD, bcrypt_cost)?;
        Ok(Self {
            pool,
            bcrypt_cost,
            dummy_hash,
        })
    }

    async fn get_user(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepo for IdentityStore {
    async fn register(&self, username: &str, password: &str) -> DbResult<User> {
        if self.get_user(username).await?.is_some() {
            return Err(DbError::AlreadyExists(format!("User {}", username)));
        }

        let hashed = hash_password(password, self.bcrypt_cost)?;

        // A concurrent registration can still win the race; the UNIQUE
        // constraint rejects the second writer.
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(&hashed)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::AlreadyExists(format!("User {}", username))
                } else {
                    DbError::Sqlx(e)
                }
            })?;

        info!("Registered user {}", username);

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            password_hash: hashed,
        })
    }

    async fn login(&self, username: &str, password: &str) -> DbResult<User> {
        match self.get_user(username).await? {
            Some(user) => {
                if verify_password(password, &user.password_hash)? {
                    Ok(user)
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

    async fn get_user_by_id(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found(e, format!("User {}", id)))
    }
}

#[async_trait]
impl RatingRepo for IdentityStore {
    async fn submit_rating(&self, user_id: i64, product_id: i64, rating: i64) -> DbResult<Rating> {
        let created = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO ratings (user_id, product_id, rating, created) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(&created)
        .execute(&self.pool)
        .await?;

        Ok(Rating {
            id: result.last_insert_rowid(),
            user_id,
            product_id,
            rating,
            created: Some(created),
        })
    }

    async fn average_rating(&self, product_id: i64) -> DbResult<f64> {
        let (avg,): (Option<f64>,) =
            sqlx::query_as("SELECT AVG(rating) FROM ratings WHERE product_id = ?")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(avg.unwrap_or(0.0))
    }

    async fn ratings_for_product(&self, product_id: i64) -> DbResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT id, user_id, product_id, rating, created FROM ratings
             WHERE product_id = ? ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::MEMORY;
    use std::time::Instant;

    async fn store() -> IdentityStore {
        IdentityStore::new(MEMORY, 4).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        let store = store().await;
        store.register("alice", "rosewater").await.unwrap();

        let err = store.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));

        // The first registration's hash is untouched.
        assert!(store.login("alice", "rosewater").await.is_ok());
        assert!(matches!(
            store.login("alice", "other").await,
            Err(DbError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_username_is_case_sensitive() {
        let store = store().await;
        store.register("alice", "a").await.unwrap();
        assert!(store.register("Alice", "b").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_unknown_user() {
        let store = store().await;
        store.register("bob", "hunter2").await.unwrap();

        let unknown = store.login("nobody", "hunter2").await.unwrap_err();
        let wrong = store.login("bob", "wrong").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_unknown_user_costs_a_hash_check() {
        let store = IdentityStore::new(MEMORY, 8).await.unwrap();
        store.register("bob", "hunter2").await.unwrap();

        let start = Instant::now();
        assert!(store.login("bob", "wrong").await.is_err());
        let wrong_password = start.elapsed();

        let start = Instant::now();
        assert!(store.login("nobody", "wrong").await.is_err());
        let unknown_user = start.elapsed();

        // Without a verify the unknown-user path answers in microseconds.
        assert!(
            unknown_user * 4 >= wrong_password,
            "unknown user {:?}, wrong password {:?}",
            unknown_user,
            wrong_password
        );
    }

    #[tokio::test]
    async fn test_password_is_not_stored_in_clear() {
        let store = store().await;
        let user = store.register("carol", "plaintext").await.unwrap();
        assert_ne!(user.password_hash, "plaintext");
        let fetched = store.get_user_by_id(user.id).await.unwrap();
        assert_eq!(fetched.username, "carol");
    }

    #[tokio::test]
    async fn test_average_rating() {
        let store = store().await;
        let user = store.register("dave", "pw").await.unwrap();

        assert_eq!(store.average_rating(7).await.unwrap(), 0.0);

        for rating in [3, 4, 5] {
            store.submit_rating(user.id, 7, rating).await.unwrap();
        }
        assert_eq!(store.average_rating(7).await.unwrap(), 4.0);
        assert_eq!(store.ratings_for_product(7).await.unwrap().len(), 3);
        assert_eq!(store.average_rating(8).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_ratings_are_append_only() {
        let store = store().await;
        let user = store.register("erin", "pw").await.unwrap();
        store.submit_rating(user.id, 1, 1).await.unwrap();
        store.submit_rating(user.id, 1, 5).await.unwrap();

        let ratings = store.ratings_for_product(1).await.unwrap();
        assert_eq!(ratings.iter().map(|r| r.rating).collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(store.average_rating(1).await.unwrap(), 3.0);
    }
}
