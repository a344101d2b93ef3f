use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::extract::JsonBody;
use super::types::*;
use crate::db::{AdminRepo, CatalogEntry, CatalogRepo, Product};
use crate::error::{AppError, AppResult};
use crate::server::AppState;

pub async fn admin_login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> AppResult<Json<AdminLoginResponse>> {
    let admin = state.admins.login_admin(&req.username, &req.password).await?;
    info!("Admin {} logged in", admin.username);
    Ok(Json(AdminLoginResponse {
        username: admin.username,
    }))
}

pub async fn admin_list_products(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(state.catalog.list_products().await?))
}

pub async fn admin_add_product(
    State(state): State<AppState>,
    JsonBody(product): JsonBody<Product>,
) -> AppResult<(StatusCode, Json<CatalogEntry>)> {
    validate_name(&product.name)?;
    let entry = state.catalog.add_product(&product).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Replaces the product stored under `name`; `product.name` may differ to
/// rename it. Existing ratings keep their product id.
pub async fn admin_update_product(
    State(state): State<AppState>,
    Path(name): Path<String>,
    JsonBody(product): JsonBody<Product>,
) -> AppResult<StatusCode> {
    validate_name(&product.name)?;
    state.catalog.update_product(&name, &product).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_delete_product(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<StatusCode> {
    state.catalog.delete_product(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("product name is empty".to_string()));
    }
    Ok(())
}
