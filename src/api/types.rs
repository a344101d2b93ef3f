use serde::{Deserialize, Serialize};

use crate::recommend::Recommendation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductQuery {
    pub product: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    pub product: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRequest {
    pub product: String,
    pub rating: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingResponse {
    pub id: i64,
    pub product: String,
    #[serde(rename = "productId")]
    pub product_id: i64,
    pub rating: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AverageRatingResponse {
    pub product: String,
    #[serde(rename = "productId")]
    pub product_id: i64,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub username: String,
}
