pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod middleware;
pub mod recommend;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Similarity index error: {0}")]
    Index(#[from] index::IndexError),
    #[error("Server error: {0}")]
    Server(String),
}

/// Load the similarity artifacts, open the three stores and seed the
/// bootstrap admin account.
pub async fn build_state(config: config::Config) -> Result<server::AppState, ServerError> {
    let index = Arc::new(index::SimilarityIndex::load(&config.artifacts)?);

    let cost = config.admin.bcrypt_cost;

    let main_path = config.main_database_path();
    info!("Opening user database at {}", main_path);
    let identity = Arc::new(db::IdentityStore::new(&main_path, cost).await?);

    let product_path = config.product_database_path();
    info!("Opening product database at {}", product_path);
    let catalog = Arc::new(db::CatalogStore::new(&product_path).await?);

    let admin_path = config.admin_database_path();
    info!("Opening admin database at {}", admin_path);
    let admins = Arc::new(db::AdminStore::new(&admin_path, cost).await?);
    admins
        .seed_admin(&config.admin.username, &config.admin.password)
        .await?;

    Ok(server::AppState::new(config, index, identity, catalog, admins))
}

pub async fn run(config_path: &str, debug_logs: bool) -> Result<(), ServerError> {
    let mut config = config::Config::from_file(config_path)?;
    config.debug_logs = debug_logs;

    info!("Using config file: {}", config_path);
    if config.debug_logs {
        info!("Debug logging enabled");
    }

    let address = config.listen.address.clone().unwrap_or_else(|| "[::]".to_string());
    let addr: SocketAddr = format!("{}:{}", address, config.listen.port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = build_state(config).await?;
    let app = server::build_router(state);

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

        info!("Serving HTTPS on {}", addr);

        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    }

    Ok(())
}
