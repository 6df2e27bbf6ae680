mod error;
mod extract;
mod file;
mod forward;
mod info;
mod transform;

pub use error::{ApiError, ApiResult};

use crate::app::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// The file proxy and status page have their own routes. Every other request is
/// forwarded to the upstream.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(info::get_info))
        .route("/proxy/{file_id}", get(file::proxy_file))
        .fallback(forward::forward)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
