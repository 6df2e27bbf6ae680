use crate::api::ApiResult;
use crate::api::extract::ProxyLink;
use crate::app::AppState;
use crate::content::cache;
use axum::extract::State;
use axum::response::Response;

pub async fn proxy_file(State(state): State<AppState>, link: ProxyLink) -> ApiResult<Response> {
    cache::serve(&state, &link.file_id, link.signature.as_deref()).await
}
