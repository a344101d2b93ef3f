pub mod artifacts;
pub mod knn;

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::ArtifactConfig;
pub use artifacts::{PivotTable, ProductTypeRow, RatingRecord};
pub use knn::{Metric, ModelParams, NearestNeighbors, Neighbor};

/// The offline-trained similarity model and its lookup tables.
///
/// Loaded once at startup and never mutated afterwards, so it is shared
/// between requests behind an `Arc` without locking.
#[derive(Debug)]
pub struct SimilarityIndex {
    labels: Vec<String>,
    rows_by_label: HashMap<String, usize>,
    names: Vec<String>,
    posters: HashMap<String, Option<String>>,
    product_types: Vec<ProductTypeRow>,
    model: NearestNeighbors,
}

impl SimilarityIndex {
    pub fn load(config: &ArtifactConfig) -> Result<Self, IndexError> {
        info!("Loading similarity artifacts from {}", config.directory);

        let pivot: PivotTable = artifacts::read_json(&config.path(&config.pivot))?;
        let ratings: Vec<RatingRecord> = artifacts::read_json(&config.path(&config.final_rating))?;
        let names: Option<Vec<String>> = artifacts::read_json_optional(&config.path(&config.names))?;
        let product_types: Vec<ProductTypeRow> =
            artifacts::read_json_optional(&config.path(&config.product_types))?.unwrap_or_default();
        let params: ModelParams =
            artifacts::read_json_optional(&config.path(&config.model))?.unwrap_or_default();

        let index = Self::from_parts(pivot, names, ratings, product_types, params)?;

        info!(
            "Similarity index: {} products, metric {}",
            index.labels.len(),
            index.model.metric()
        );

        Ok(index)
    }

    /// Build an index from already-parsed tables. Without an explicit product
    /// list the pivot row labels serve as the frozen product list.
    pub fn from_parts(
        pivot: PivotTable,
        names: Option<Vec<String>>,
        ratings: Vec<RatingRecord>,
        product_types: Vec<ProductTypeRow>,
        params: ModelParams,
    ) -> Result<Self, IndexError> {
        let metric = Metric::from_name(&params.metric, params.p)?;
        let (labels, rows) = pivot.into_rows()?;

        let mut rows_by_label = HashMap::with_capacity(labels.len());
        for (row, label) in labels.iter().enumerate() {
            rows_by_label.entry(label.clone()).or_insert(row);
        }
        if rows_by_label.len() != labels.len() {
            warn!(
                "Pivot table has {} duplicate row labels; the first row is used",
                labels.len() - rows_by_label.len()
            );
        }

        // First row in file order wins for a repeated product name.
        let mut posters = HashMap::new();
        let mut duplicates = 0usize;
        for record in ratings {
            if posters.contains_key(&record.product_name) {
                duplicates += 1;
                continue;
            }
            posters.insert(record.product_name, record.image);
        }
        if duplicates > 0 {
            info!("Ignored {} repeated rows in the flat ratings table", duplicates);
        }

        let missing = labels.iter().filter(|l| !posters.contains_key(*l)).count();
        if missing > 0 {
            warn!("{} pivot products have no row in the flat ratings table", missing);
        }

        Ok(Self {
            names: names.unwrap_or_else(|| labels.clone()),
            model: NearestNeighbors::fit(rows, metric),
            labels,
            rows_by_label,
            posters,
            product_types,
        })
    }

    /// The frozen product list shipped with the model.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn row_of(&self, name: &str) -> Option<usize> {
        self.rows_by_label.get(name).copied()
    }

    pub fn label(&self, row: usize) -> Option<&str> {
        self.labels.get(row).map(|s| s.as_str())
    }

    pub fn poster_for(&self, name: &str) -> Option<&str> {
        self.posters.get(name).and_then(|p| p.as_deref())
    }

    pub fn product_types(&self) -> &[ProductTypeRow] {
        &self.product_types
    }

    pub fn model(&self) -> &NearestNeighbors {
        &self.model
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Failed to read artifact {0}: {1}")]
    Io(String, std::io::Error),
    #[error("Failed to parse artifact {0}: {1}")]
    Json(String, serde_json::Error),
    #[error("Inconsistent pivot table: {0}")]
    Shape(String),
    #[error("Unsupported distance metric: {0}")]
    UnknownMetric(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Five products rated by four raters. "Aloe Gel" and "Aloe Mist" are
    /// close, "Clay Mask" and "Charcoal Mask" are close.
    pub(crate) fn sample_index() -> SimilarityIndex {
        let pivot: PivotTable = serde_json::from_value(json!({
            "index": ["Aloe Gel", "Aloe Mist", "Clay Mask", "Charcoal Mask", "Sun Milk"],
            "columns": [1, 2, 3, 4],
            "data": [
                [5.0, 4.0, null, null],
                [5.0, 5.0, null, null],
                [null, null, 5.0, 4.0],
                [null, 1.0, 5.0, 5.0],
                [3.0, 3.0, 3.0, 3.0]
            ]
        }))
        .unwrap();

        let ratings: Vec<RatingRecord> = serde_json::from_value(json!([
            {"Product Name": "Aloe Gel", "Image": "http://img/aloe-gel.jpg"},
            {"Product Name": "Aloe Gel", "Image": "http://img/aloe-gel-2.jpg"},
            {"Product Name": "Aloe Mist", "Image": "http://img/aloe-mist.jpg"},
            {"Product Name": "Clay Mask", "Image": "http://img/clay.jpg"},
            {"Product Name": "Charcoal Mask", "Image": "http://img/charcoal.jpg"},
            {"Product Name": "Sun Milk", "Image": "http://img/sun.jpg"}
        ]))
        .unwrap();

        let types: Vec<ProductTypeRow> = serde_json::from_value(json!([
            {"Product Name": "Aloe Gel", "Category": "Moisturizer", "Skin Type": "Dry"}
        ]))
        .unwrap();

        SimilarityIndex::from_parts(pivot, None, ratings, types, ModelParams::default()).unwrap()
    }

    #[test]
    fn test_lookups() {
        let index = sample_index();
        assert_eq!(index.names().len(), 5);
        assert_eq!(index.row_of("Clay Mask"), Some(2));
        assert_eq!(index.row_of("Unknown"), None);
        assert_eq!(index.label(4), Some("Sun Milk"));
        assert_eq!(index.product_types().len(), 1);
    }

    #[test]
    fn test_first_poster_wins() {
        let index = sample_index();
        assert_eq!(index.poster_for("Aloe Gel"), Some("http://img/aloe-gel.jpg"));
        assert_eq!(index.poster_for("Unknown"), None);
    }

    #[test]
    fn test_unknown_metric_fails() {
        let pivot: PivotTable =
            serde_json::from_value(json!({"index": ["A"], "columns": [1], "data": [[1.0]]})).unwrap();
        let params = ModelParams {
            metric: "jaccard".to_string(),
            p: None,
        };
        assert!(matches!(
            SimilarityIndex::from_parts(pivot, None, vec![], vec![], params),
            Err(IndexError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("skincare-index-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("skincare_pivot.json"),
            r#"{"index": ["A", "B"], "columns": ["u1"], "data": [[1.0], [2.0]]}"#,
        )
        .unwrap();
        std::fs::write(dir.join("skincare_names.json"), r#"["A", "B", "C"]"#).unwrap();
        std::fs::write(
            dir.join("final_rating.json"),
            r#"[{"Product Name": "A", "Image": "a.jpg"}, {"Product Name": "B", "Image": "b.jpg"}]"#,
        )
        .unwrap();
        std::fs::write(dir.join("model.json"), r#"{"metric": "minkowski", "p": 1, "n_neighbors": 2}"#)
            .unwrap();

        let config = ArtifactConfig {
            directory: dir.to_string_lossy().to_string(),
            ..ArtifactConfig::default()
        };
        let index = SimilarityIndex::load(&config).unwrap();
        assert_eq!(index.names(), ["A", "B", "C"]);
        assert_eq!(index.model().metric(), Metric::Manhattan);
        assert!(index.product_types().is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
