use crate::api;
use crate::config::{self, Config, ConfigError, STORE_DEADLINE};
use crate::content::link::LinkSigner;
use crate::content::object::ObjectCache;
use crate::content::s3::S3ObjectCache;
use crate::db::{self, DatabaseError};
use crate::store::{MetadataStore, PgMetadataStore};
use axum::ServiceExt;
use axum::extract::Request;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::SignalKind;
use tower::layer::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Everything a request handler needs. Built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub signer: Arc<LinkSigner>,
    pub client: reqwest::Client,
    pub objects: Arc<dyn ObjectCache>,
    pub metadata: Arc<dyn MetadataStore>,
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum InitializationError {
    Config(#[from] ConfigError),
    Database(#[from] DatabaseError),
    HttpClient(#[from] reqwest::Error),
    #[error("Failed to generate signing secret: {0}")]
    Random(getrandom::Error),
}

pub fn enable_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn initialize() -> Result<AppState, InitializationError> {
    info!("Starting e6-cache...");
    let config = config::create()?;

    info!("Connecting to database...");
    let pool = db::create_pool(&config.database)?;
    db::migrate(&pool)?;
    let metadata = PgMetadataStore::new(pool, STORE_DEADLINE);

    info!("Connecting to object store...");
    let objects = S3ObjectCache::new(&config.object_store).await;

    let signer = LinkSigner::generate().map_err(InitializationError::Random)?;
    let client = reqwest::Client::builder().connect_timeout(STORE_DEADLINE).build()?;

    Ok(AppState {
        config: Arc::new(config),
        signer: Arc::new(signer),
        client,
        objects: Arc::new(objects),
        metadata: Arc::new(metadata),
    })
}

pub async fn run(state: AppState) -> std::io::Result<()> {
    let port = state.config.port;
    let app = NormalizePathLayer::trim_trailing_slash().layer(api::routes(state));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Stopping server...");
}
