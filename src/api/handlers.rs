use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use super::auth::basic_credentials;
use super::extract::{JsonBody, QueryParams};
use super::types::*;
use crate::db::{DbError, RatingRepo, UserRepo};
use crate::error::{AppError, AppResult};
use crate::index::ProductTypeRow;
use crate::recommend::merged_catalog;
use crate::server::AppState;

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;

pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let names = merged_catalog(&state.index, state.catalog.as_ref()).await?;
    Ok(Json(names.into_iter().collect()))
}

pub async fn list_product_types(State(state): State<AppState>) -> Json<Vec<ProductTypeRow>> {
    Json(state.index.product_types().to_vec())
}

pub async fn recommend(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
) -> AppResult<Json<RecommendResponse>> {
    let recommendations = state.recommender.recommend(&query.product).await?;
    Ok(Json(RecommendResponse {
        product: query.product,
        recommendations,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .identity
        .register(&req.username, &req.password)
        .await
        .map_err(|e| match e {
            DbError::AlreadyExists(_) => AppError::DuplicateUsername(req.username.clone()),
            other => other.into(),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state.identity.login(&req.username, &req.password).await?;
    info!("User {} logged in", user.username);
    Ok(Json(UserResponse {
        id: user.id,
        username: user.username,
    }))
}

/// Records a rating for the user named in the Basic credentials.
pub async fn submit_rating(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<RatingRequest>,
) -> AppResult<(StatusCode, Json<RatingResponse>)> {
    let (username, password) = basic_credentials(&headers).ok_or(AppError::InvalidCredentials)?;
    let user = state.identity.login(&username, &password).await?;

    if !(MIN_RATING..=MAX_RATING).contains(&req.rating) {
        return Err(AppError::InvalidInput(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }

    let product_id = state.recommender.resolve_product_id(&req.product).await?;
    let rating = state
        .identity
        .submit_rating(user.id, product_id, req.rating)
        .await?;

    info!("User {} rated {} with {}", user.username, req.product, req.rating);

    Ok((
        StatusCode::CREATED,
        Json(RatingResponse {
            id: rating.id,
            product: req.product,
            product_id,
            rating: rating.rating,
        }),
    ))
}

pub async fn average_rating(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
) -> AppResult<Json<AverageRatingResponse>> {
    let product_id = state.recommender.resolve_product_id(&query.product).await?;
    let average = state.identity.average_rating(product_id).await?;
    let count = state.identity.ratings_for_product(product_id).await?.len();

    Ok(Json(AverageRatingResponse {
        product: query.product,
        product_id,
        average,
        count,
    }))
}
