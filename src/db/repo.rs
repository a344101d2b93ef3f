use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `AlreadyExists` when the username is taken.
    async fn register(&self, username: &str, password: &str) -> DbResult<User>;
    /// Unknown user and wrong password both yield `InvalidCredentials`.
    async fn login(&self, username: &str, password: &str) -> DbResult<User>;
    async fn get_user_by_id(&self, id: i64) -> DbResult<User>;
}

#[async_trait]
pub trait RatingRepo: Send + Sync {
    async fn submit_rating(&self, user_id: i64, product_id: i64, rating: i64) -> DbResult<Rating>;
    async fn average_rating(&self, product_id: i64) -> DbResult<f64>;
    async fn ratings_for_product(&self, product_id: i64) -> DbResult<Vec<Rating>>;
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn add_product(&self, product: &Product) -> DbResult<CatalogEntry>;
    async fn list_products(&self) -> DbResult<Vec<CatalogEntry>>;
    async fn update_product(&self, old_name: &str, product: &Product) -> DbResult<()>;
    async fn delete_product(&self, name: &str) -> DbResult<()>;
    async fn product_names(&self) -> DbResult<Vec<String>>;
    async fn find_product_id(&self, name: &str) -> DbResult<Option<i64>>;
}

#[async_trait]
pub trait AdminRepo: Send + Sync {
    async fn add_admin(&self, username: &str, password: &str) -> DbResult<()>;
    async fn login_admin(&self, username: &str, password: &str) -> DbResult<AdminUser>;
}
