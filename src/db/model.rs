use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub rating: i64,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Facial Wash")]
    FacialWash,
    Mask,
    Moisturizer,
    Sunscreen,
    Toner,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::FacialWash,
        Category::Mask,
        Category::Moisturizer,
        Category::Sunscreen,
        Category::Toner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FacialWash => "Facial Wash",
            Category::Mask => "Mask",
            Category::Moisturizer => "Moisturizer",
            Category::Sunscreen => "Sunscreen",
            Category::Toner => "Toner",
        }
    }
}

impl FromStr for Category {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DbError::Decode(format!("unknown category: {}", s)))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkinType {
    Normal,
    Dry,
    Oily,
    Sensitive,
    Combination,
}

impl SkinType {
    pub const ALL: [SkinType; 5] = [
        SkinType::Normal,
        SkinType::Dry,
        SkinType::Oily,
        SkinType::Sensitive,
        SkinType::Combination,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinType::Normal => "Normal",
            SkinType::Dry => "Dry",
            SkinType::Oily => "Oily",
            SkinType::Sensitive => "Sensitive",
            SkinType::Combination => "Combination",
        }
    }
}

impl FromStr for SkinType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkinType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DbError::Decode(format!("unknown skin type: {}", s)))
    }
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog row. The product name is its identity for admin operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub category: Category,
    pub skin_type: SkinType,
}

/// A catalog row together with its storage id (the SQLite rowid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    #[serde(flatten)]
    pub product: Product,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid stored value: {0}")]
    Decode(String),
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_display_names() {
        assert_eq!("Facial Wash".parse::<Category>().unwrap(), Category::FacialWash);
        assert_eq!(Category::Sunscreen.to_string(), "Sunscreen");
        assert!("facial wash".parse::<Category>().is_err());
    }

    #[test]
    fn test_product_json_uses_display_names() {
        let product = Product {
            name: "Aloe Gel".to_string(),
            category: Category::FacialWash,
            skin_type: SkinType::Combination,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["category"], "Facial Wash");
        assert_eq!(json["skin_type"], "Combination");
    }
}
