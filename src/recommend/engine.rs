use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::merge::merged_catalog;
use crate::db::{CatalogRepo, DbError};
use crate::index::SimilarityIndex;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub name: String,
    pub poster_url: Option<String>,
    pub distance: f64,
}

/// Where a product name is known. A name can live in the live catalog, in
/// the trained index, or in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProductLocation {
    pub catalog_id: Option<i64>,
    pub index_row: Option<usize>,
}

impl ProductLocation {
    pub fn is_known(&self) -> bool {
        self.catalog_id.is_some() || self.index_row.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Recommendation model doesn't contain this product: {0}")]
    ModelCoverageGap(String),
    #[error(transparent)]
    Catalog(#[from] DbError),
}

pub struct Recommender {
    index: Arc<SimilarityIndex>,
    catalog: Arc<dyn CatalogRepo>,
    neighbors: usize,
}

impl Recommender {
    pub fn new(index: Arc<SimilarityIndex>, catalog: Arc<dyn CatalogRepo>, neighbors: usize) -> Self {
        Self {
            index,
            catalog,
            neighbors,
        }
    }

    /// The `neighbors` products most similar to `name`, nearest first. The
    /// queried product itself leads the list at distance 0.
    pub async fn recommend(&self, name: &str) -> Result<Vec<Recommendation>, RecommendError> {
        let universe = merged_catalog(&self.index, self.catalog.as_ref()).await?;
        if !universe.contains(name) {
            warn!("Recommendation requested for unknown product {}", name);
            return Err(RecommendError::NotFound(name.to_string()));
        }

        let row = match self.index.row_of(name) {
            Some(row) => row,
            None => {
                warn!("Product {} is not covered by the similarity model", name);
                return Err(RecommendError::ModelCoverageGap(name.to_string()));
            }
        };

        let neighbors = self.index.model().kneighbors_of_row(row, self.neighbors);

        let mut results = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let label = match self.index.label(neighbor.row) {
                Some(label) => label,
                None => continue,
            };
            debug!(product = label, distance = neighbor.distance, "neighbor");
            results.push(Recommendation {
                name: label.to_string(),
                poster_url: self.index.poster_for(label).map(|s| s.to_string()),
                distance: neighbor.distance,
            });
        }

        Ok(results)
    }

    /// Look `name` up in both the live catalog and the trained index.
    pub async fn resolve_product(&self, name: &str) -> Result<ProductLocation, RecommendError> {
        Ok(ProductLocation {
            catalog_id: self.catalog.find_product_id(name).await?,
            index_row: self.index.row_of(name),
        })
    }

    /// The id ratings are stored under. Only catalog rows carry an id, so a
    /// product known solely to the trained index cannot be rated.
    pub async fn resolve_product_id(&self, name: &str) -> Result<i64, RecommendError> {
        let location = self.resolve_product(name).await?;
        match location {
            ProductLocation {
                catalog_id: Some(id),
                ..
            } => Ok(id),
            ProductLocation {
                index_row: Some(_),
                ..
            } => Err(RecommendError::NotFound(format!(
                "{} (not in the product catalog)",
                name
            ))),
            _ => Err(RecommendError::NotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::MEMORY;
    use crate::db::{CatalogStore, Category, IdentityStore, Product, RatingRepo, SkinType, UserRepo};
    use crate::index::tests::sample_index;
    use crate::index::{ModelParams, PivotTable, RatingRecord};
    use serde_json::json;

    async fn recommender() -> (Recommender, Arc<CatalogStore>) {
        let catalog = Arc::new(CatalogStore::new(MEMORY).await.unwrap());
        let rec = Recommender::new(Arc::new(sample_index()), catalog.clone(), 4);
        (rec, catalog)
    }

    fn product(name: &str) -> Product {
        Product {
            name: name.to_string(),
            category: Category::Moisturizer,
            skin_type: SkinType::Sensitive,
        }
    }

    #[tokio::test]
    async fn test_recommend_starts_with_self() {
        let (rec, _) = recommender().await;
        let results = rec.recommend("Aloe Gel").await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].name, "Aloe Gel");
        assert_eq!(results[0].distance, 0.0);
        assert_eq!(results[1].name, "Aloe Mist");
        assert!(results.iter().all(|r| r.poster_url.is_some()));
        assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(results[0].poster_url.as_deref(), Some("http://img/aloe-gel.jpg"));
    }

    #[tokio::test]
    async fn test_recommend_unknown_product() {
        let (rec, _) = recommender().await;
        assert!(matches!(
            rec.recommend("Snail Essence").await,
            Err(RecommendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_recommend_catalog_only_product() {
        let (rec, catalog) = recommender().await;
        catalog.add_product(&product("Snail Essence")).await.unwrap();
        assert!(matches!(
            rec.recommend("Snail Essence").await,
            Err(RecommendError::ModelCoverageGap(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_product_precedence() {
        let (rec, catalog) = recommender().await;
        let entry = catalog.add_product(&product("Clay Mask")).await.unwrap();
        catalog.add_product(&product("Snail Essence")).await.unwrap();

        let both = rec.resolve_product("Clay Mask").await.unwrap();
        assert_eq!(both.catalog_id, Some(entry.id));
        assert_eq!(both.index_row, Some(2));
        assert_eq!(rec.resolve_product_id("Clay Mask").await.unwrap(), entry.id);

        assert!(rec.resolve_product_id("Snail Essence").await.is_ok());

        let index_only = rec.resolve_product("Sun Milk").await.unwrap();
        assert!(index_only.is_known());
        assert_eq!(index_only.catalog_id, None);
        assert!(matches!(
            rec.resolve_product_id("Sun Milk").await,
            Err(RecommendError::NotFound(_))
        ));

        assert!(!rec.resolve_product("Nothing").await.unwrap().is_known());
    }

    #[tokio::test]
    async fn test_deleted_product_keeps_ratings() {
        let (rec, catalog) = recommender().await;
        let identity = IdentityStore::new(MEMORY, 4).await.unwrap();
        let user = identity.register("fay", "pw").await.unwrap();

        catalog.add_product(&product("Night Cream")).await.unwrap();
        let id = rec.resolve_product_id("Night Cream").await.unwrap();
        identity.submit_rating(user.id, id, 5).await.unwrap();

        catalog.delete_product("Night Cream").await.unwrap();
        assert!(rec.resolve_product_id("Night Cream").await.is_err());
        assert_eq!(identity.ratings_for_product(id).await.unwrap().len(), 1);
        assert_eq!(identity.average_rating(id).await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn test_neighbor_without_poster_row() {
        let pivot: PivotTable = serde_json::from_value(json!({
            "index": ["Green Tea Toner", "Rice Toner", "Mud Mask"],
            "columns": [1, 2],
            "data": [[5.0, 4.0], [5.0, 5.0], [1.0, null]]
        }))
        .unwrap();
        // "Rice Toner" has no row in the flat ratings table.
        let ratings: Vec<RatingRecord> = serde_json::from_value(json!([
            {"Product Name": "Green Tea Toner", "Image": "http://img/green-tea.jpg"},
            {"Product Name": "Mud Mask", "Image": null}
        ]))
        .unwrap();
        let index =
            SimilarityIndex::from_parts(pivot, None, ratings, vec![], ModelParams::default()).unwrap();

        let catalog = Arc::new(CatalogStore::new(MEMORY).await.unwrap());
        let rec = Recommender::new(Arc::new(index), catalog, 3);
        let results = rec.recommend("Green Tea Toner").await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Green Tea Toner", "Rice Toner", "Mud Mask"]);
        assert_eq!(results[0].poster_url.as_deref(), Some("http://img/green-tea.jpg"));
        assert_eq!(results[1].poster_url, None);
        assert_eq!(results[2].poster_url, None);
    }
}
