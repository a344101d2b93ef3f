//! JSON exports of the offline training tables.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::IndexError;

/// Product-by-rater matrix in pandas `orient="split"` layout.
#[derive(Debug, Clone, Deserialize)]
pub struct PivotTable {
    pub index: Vec<String>,
    #[serde(default)]
    pub columns: Vec<Value>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    /// Dense rows with missing cells read as 0. Every row must have one cell
    /// per column and there must be one row per label.
    pub fn into_rows(self) -> Result<(Vec<String>, Vec<Vec<f64>>), IndexError> {
        if self.index.len() != self.data.len() {
            return Err(IndexError::Shape(format!(
                "{} row labels but {} data rows",
                self.index.len(),
                self.data.len()
            )));
        }

        let width = if self.columns.is_empty() {
            self.data.first().map(|r| r.len()).unwrap_or(0)
        } else {
            self.columns.len()
        };

        let mut rows = Vec::with_capacity(self.data.len());
        for (label, row) in self.index.iter().zip(self.data) {
            if row.len() != width {
                return Err(IndexError::Shape(format!(
                    "row {} has {} cells, expected {}",
                    label,
                    row.len(),
                    width
                )));
            }
            rows.push(row.into_iter().map(|c| c.unwrap_or(0.0)).collect());
        }

        Ok((self.index, rows))
    }
}

/// One row of the flat ratings table (`orient="records"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRecord {
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Image", default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type ProductTypeRow = Map<String, Value>;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IndexError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| IndexError::Io(path.display().to_string(), e))?;
    serde_json::from_str(&content).map_err(|e| IndexError::Json(path.display().to_string(), e))
}

/// Like `read_json`, but a missing file yields `None`.
pub fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, IndexError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}
