use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tracing::info;

use super::model::*;
use super::repo::*;
use super::sqlite::open_pool;

/// The admin-owned product catalog (product.db).
///
/// Product names are not unique at the storage level. Lookups by name
/// act on the earliest row carrying that name; update and delete act on
/// every row carrying it.
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let pool = open_pool(db_path, include_str!("catalog.sql")).await?;
        Ok(Self { pool })
    }
}

fn decode_row(row: (i64, String, String, String)) -> DbResult<CatalogEntry> {
    Ok(CatalogEntry {
        id: row.0,
        product: Product {
            name: row.1,
            category: row.2.parse()?,
            skin_type: row.3.parse()?,
        },
    })
}

#[async_trait]
impl CatalogRepo for CatalogStore {
    async fn add_product(&self, product: &Product) -> DbResult<CatalogEntry> {
        let result = sqlx::query("INSERT INTO product (name, category, type) VALUES (?, ?, ?)")
            .bind(&product.name)
            .bind(product.category.as_str())
            .bind(product.skin_type.as_str())
            .execute(&self.pool)
            .await?;

        info!("Added product {}", product.name);

        Ok(CatalogEntry {
            id: result.last_insert_rowid(),
            product: product.clone(),
        })
    }

    async fn list_products(&self) -> DbResult<Vec<CatalogEntry>> {
        let rows = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT rowid, name, category, type FROM product ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn update_product(&self, old_name: &str, product: &Product) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE product SET name = ?, category = ?, type = ? WHERE name = ?")
                .bind(&product.name)
                .bind(product.category.as_str())
                .bind(product.skin_type.as_str())
                .bind(old_name)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Product {}", old_name)));
        }

        info!("Updated product {} -> {}", old_name, product.name);
        Ok(())
    }

    async fn delete_product(&self, name: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM product WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Product {}", name)));
        }

        info!("Deleted product {}", name);
        Ok(())
    }

    async fn product_names(&self) -> DbResult<Vec<String>> {
        let results = sqlx::query_as::<_, (String,)>("SELECT name FROM product ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;

        Ok(results.into_iter().map(|r| r.0).collect())
    }

    async fn find_product_id(&self, name: &str) -> DbResult<Option<i64>> {
        let result = sqlx::query_as::<_, (i64,)>(
            "SELECT rowid FROM product WHERE name = ? ORDER BY rowid LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.map(|r| r.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::MEMORY;

    fn product(name: &str) -> Product {
        Product {
            name: name.to_string(),
            category: Category::Toner,
            skin_type: SkinType::Oily,
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let store = CatalogStore::new(MEMORY).await.unwrap();
        assert!(store.list_products().await.unwrap().is_empty());

        let a = store.add_product(&product("Rose Toner")).await.unwrap();
        store.add_product(&product("Green Tea Toner")).await.unwrap();
        assert_eq!(
            store.product_names().await.unwrap(),
            vec!["Rose Toner", "Green Tea Toner"]
        );

        let renamed = Product {
            name: "Rose Toner Plus".to_string(),
            category: Category::Mask,
            skin_type: SkinType::Dry,
        };
        store.update_product("Rose Toner", &renamed).await.unwrap();

        let listed = store.list_products().await.unwrap();
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[0].product, renamed);

        store.delete_product("Green Tea Toner").await.unwrap();
        assert_eq!(store.product_names().await.unwrap(), vec!["Rose Toner Plus"]);
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_found() {
        let store = CatalogStore::new(MEMORY).await.unwrap();
        assert!(matches!(
            store.update_product("Missing", &product("X")).await,
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            store.delete_product("Missing").await,
            Err(DbError::NotFound(_))
        ));
        assert_eq!(store.find_product_id("Missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_product_id_is_stable_across_deletes() {
        let store = CatalogStore::new(MEMORY).await.unwrap();
        store.add_product(&product("First")).await.unwrap();
        let second = store.add_product(&product("Second")).await.unwrap();

        store.delete_product("First").await.unwrap();
        assert_eq!(store.find_product_id("Second").await.unwrap(), Some(second.id));
    }

    #[tokio::test]
    async fn test_duplicate_names_resolve_to_earliest_row() {
        let store = CatalogStore::new(MEMORY).await.unwrap();
        let first = store.add_product(&product("Twin")).await.unwrap();
        store.add_product(&product("Twin")).await.unwrap();
        assert_eq!(store.find_product_id("Twin").await.unwrap(), Some(first.id));
    }
}
