use std::collections::BTreeSet;

use crate::db::{CatalogRepo, DbResult};
use crate::index::SimilarityIndex;

/// Every product a user may pick: the index's frozen product list joined
/// with the live catalog. Names present in both appear once.
pub async fn merged_catalog(
    index: &SimilarityIndex,
    catalog: &dyn CatalogRepo,
) -> DbResult<BTreeSet<String>> {
    let mut names: BTreeSet<String> = index.names().iter().cloned().collect();
    names.extend(catalog.product_names().await?);
    Ok(names)
}
