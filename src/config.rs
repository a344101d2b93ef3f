use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

/// Location of the offline-produced similarity artifacts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_artifact_dir")]
    pub directory: String,
    #[serde(default = "default_pivot_file")]
    pub pivot: String,
    #[serde(default = "default_names_file")]
    pub names: String,
    #[serde(alias = "finalrating", rename = "final_rating")]
    #[serde(default = "default_final_rating_file")]
    pub final_rating: String,
    #[serde(alias = "producttypes", rename = "product_types")]
    #[serde(default = "default_product_types_file")]
    pub product_types: String,
    #[serde(default = "default_model_file")]
    pub model: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            directory: default_artifact_dir(),
            pivot: default_pivot_file(),
            names: default_names_file(),
            final_rating: default_final_rating_file(),
            product_types: default_product_types_file(),
            model: default_model_file(),
        }
    }
}

impl ArtifactConfig {
    pub fn path(&self, file: &str) -> PathBuf {
        PathBuf::from(&self.directory).join(file)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub admin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
    #[serde(alias = "bcryptcost", rename = "bcrypt_cost")]
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: default_admin_password(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendConfig {
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            neighbors: default_neighbors(),
        }
    }
}

fn default_port() -> String {
    "8501".to_string()
}

fn default_artifact_dir() -> String {
    "artifacts".to_string()
}

fn default_pivot_file() -> String {
    "skincare_pivot.json".to_string()
}

fn default_names_file() -> String {
    "skincare_names.json".to_string()
}

fn default_final_rating_file() -> String {
    "final_rating.json".to_string()
}

fn default_product_types_file() -> String {
    "skincare_types.json".to_string()
}

fn default_model_file() -> String {
    "model.json".to_string()
}

fn default_admin_username() -> String {
    "Admin".to_string()
}

fn default_admin_password() -> String {
    "password".to_string()
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_neighbors() -> usize {
    4
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    fn database_path(&self, explicit: &Option<String>, filename: &str) -> String {
        if let Some(ref path) = explicit {
            return path.clone();
        }

        let dir = self.database.dir.as_deref().unwrap_or(".");
        PathBuf::from(dir).join(filename).to_string_lossy().to_string()
    }

    /// Users and ratings.
    pub fn main_database_path(&self) -> String {
        self.database_path(&self.database.main, "main.db")
    }

    pub fn product_database_path(&self) -> String {
        self.database_path(&self.database.product, "product.db")
    }

    pub fn admin_database_path(&self) -> String {
        self.database_path(&self.database.admin, "admin.db")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}
