use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api;
use crate::config::Config;
use crate::db::{AdminStore, CatalogStore, IdentityStore};
use crate::index::SimilarityIndex;
use crate::recommend::Recommender;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub index: Arc<SimilarityIndex>,
    pub identity: Arc<IdentityStore>,
    pub catalog: Arc<CatalogStore>,
    pub admins: Arc<AdminStore>,
    pub recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(
        config: Config,
        index: Arc<SimilarityIndex>,
        identity: Arc<IdentityStore>,
        catalog: Arc<CatalogStore>,
        admins: Arc<AdminStore>,
    ) -> Self {
        let neighbors = config.recommend.neighbors;
        let recommender = Recommender::new(index.clone(), catalog.clone(), neighbors);

        Self {
            config: Arc::new(config),
            index,
            identity,
            catalog,
            admins,
            recommender: Arc::new(recommender),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .route("/api/products", get(api::list_products))
        .route("/api/product-types", get(api::list_product_types))
        .route("/api/recommend", get(api::recommend))
        .route("/api/register", post(api::register))
        .route("/api/login", post(api::login))
        .route(
            "/api/ratings",
            get(api::average_rating).post(api::submit_rating),
        );

    let admin_routes = Router::new()
        .route(
            "/admin/products",
            get(api::admin_list_products).post(api::admin_add_product),
        )
        .route(
            "/admin/products/:name",
            put(api::admin_update_product).delete(api::admin_delete_product),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api::require_admin,
        ))
        .route("/admin/login", post(api::admin_login));

    Router::new()
        .route("/robots.txt", get(robots_txt_handler))
        .merge(user_routes)
        .merge(admin_routes)
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn fallback_handler(req: Request<axum::body::Body>) -> impl IntoResponse {
    // CORS preflight for paths without an OPTIONS route
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
