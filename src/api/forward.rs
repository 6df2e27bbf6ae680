use crate::api::transform::{self, RouteKind};
use crate::api::{ApiError, ApiResult};
use crate::app::AppState;
use crate::auth::header;
use crate::config::USER_AGENT;
use crate::content::encoding::ContentEncoding;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;
use tracing::{debug, warn};

/// The upstream signals rate limiting with this non-standard status.
const RATE_LIMITED_STATUS: u16 = 501;

const REQUEST_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Request headers that describe the hop to this proxy rather than the request itself.
const HOP_HEADERS: [&str; 8] = [
    "user-agent",
    "via",
    "host",
    "content-length",
    "x-forwarded-for",
    "x-real-ip",
    "x-forwarded-host",
    "x-forwarded-proto",
];

/// Forwards any request without a dedicated route to the upstream API and returns
/// its decoded, transformed response.
pub async fn forward(State(state): State<AppState>, request: Request) -> ApiResult<Response> {
    let (parts, body) = request.into_parts();
    let auth = parts.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let client = header::authenticate(state.config.proxy_secret.as_deref(), auth)?;

    let mut headers = forwarded_headers(&parts.headers);
    if let Some(authorization) = client.authorization {
        headers.insert(AUTHORIZATION, HeaderValue::try_from(authorization)?);
    }
    headers.insert(
        axum::http::header::USER_AGENT,
        HeaderValue::try_from(user_agent(client.username.as_deref()))?,
    );

    let mut url = state.config.upstream_url.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());

    let body = axum::body::to_bytes(body, REQUEST_BODY_LIMIT)
        .await
        .map_err(ApiError::RequestBody)?;
    let mut upstream_request = state.client.request(parts.method, url).headers(headers);
    if !body.is_empty() {
        upstream_request = upstream_request.body(body);
    }
    let upstream_response = upstream_request.send().await.map_err(ApiError::Upstream)?;

    let status = upstream_response.status();
    if status.as_u16() == RATE_LIMITED_STATUS {
        warn!("Upstream is rate limiting requests");
        return Err(ApiError::RateLimited);
    }

    let content_type = upstream_response.headers().get(CONTENT_TYPE).cloned();
    let content_encoding = upstream_response
        .headers()
        .get(CONTENT_ENCODING)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    let encoding = ContentEncoding::from_header(content_encoding.as_deref())?;
    let body = upstream_response.bytes().await.map_err(ApiError::Upstream)?;
    let body = encoding.decode(&body)?;
    debug!("Upstream answered {status} with {} bytes of {encoding} content", body.len());

    let body = if status.is_success() {
        let route = RouteKind::classify(parts.uri.path(), parts.uri.query());
        transform::apply(&state, route, body).await?
    } else {
        body
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}

fn forwarded_headers(incoming: &HeaderMap) -> HeaderMap {
    incoming
        .iter()
        .filter(|(name, _)| !HOP_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| (HeaderName::clone(name), value.clone()))
        .collect()
}

fn user_agent(username: Option<&str>) -> String {
    match username {
        Some(username) => format!("{USER_AGENT} (Request made on behalf of {username})"),
        None => String::from(USER_AGENT),
    }
}
