use crate::api::{ApiError, ApiResult};
use crate::app::AppState;
use crate::config::{MAX_CACHE_AGE, STORE_DEADLINE, USER_AGENT};
use crate::content::fanout::{self, DEFAULT_CAPACITY};
use crate::content::key::CacheKey;
use crate::content::link;
use crate::content::object::{ObjectCache, ObjectCacheError, ObjectStream};
use crate::time::DateTime;
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES};
use axum::http::HeaderValue;
use axum::response::Response;
use futures::StreamExt;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Serves the file behind a signed proxy link.
///
/// The origin URL is recovered from `file_id` and must carry a valid `signature`.
/// Cached files are streamed from the object store. Anything else is fetched from the
/// origin once and streamed to the client while a background task stores the same
/// bytes, so the next request for it is a hit.
pub async fn serve(state: &AppState, file_id: &str, signature: Option<&str>) -> ApiResult<Response> {
    let signature = signature.filter(|sig| !sig.is_empty()).ok_or(ApiError::MissingSignature)?;
    let origin = link::decode_file_id(file_id)?;
    if !state.signer.verify(origin.as_bytes(), signature) {
        return Err(ApiError::InvalidSignature);
    }
    let key = CacheKey::from_origin(&origin)?;

    let mut response = if is_cached(state.objects.as_ref(), &key).await {
        serve_cached(state.objects.as_ref(), &key).await?
    } else {
        fill_and_serve(state, &origin, key).await?
    };
    set_cache_headers(&mut response);
    Ok(response)
}

/// A failed probe counts as a miss. The origin can still serve the file.
async fn is_cached(objects: &dyn ObjectCache, key: &CacheKey) -> bool {
    match timeout(STORE_DEADLINE, objects.exists(key)).await {
        Ok(Ok(exists)) => exists,
        Ok(Err(err)) => {
            warn!("Existence check for {key} failed, fetching from origin: {err}");
            false
        }
        Err(_) => {
            warn!("Existence check for {key} timed out, fetching from origin");
            false
        }
    }
}

async fn serve_cached(objects: &dyn ObjectCache, key: &CacheKey) -> ApiResult<Response> {
    info!("Serving {key} from object store");
    let content_length = timeout(STORE_DEADLINE, objects.content_length(key))
        .await
        .map_err(|_| ObjectCacheError::Timeout(STORE_DEADLINE))??;
    let stream = timeout(STORE_DEADLINE, objects.get_stream(key))
        .await
        .map_err(|_| ObjectCacheError::Timeout(STORE_DEADLINE))??;

    let mut response = Response::new(Body::from_stream(stream));
    let headers = response.headers_mut();
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(key.mime_type().into()));
    Ok(response)
}

async fn fill_and_serve(state: &AppState, origin: &str, key: CacheKey) -> ApiResult<Response> {
    debug!("{key} is not cached, requesting it from origin");
    let origin_response = state
        .client
        .get(origin)
        .header(axum::http::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(ApiError::Upstream)?;

    let status = origin_response.status();
    let content_length = origin_response.content_length();
    let content_type = origin_response.headers().get(CONTENT_TYPE).cloned();
    let body = if status.is_success() {
        let (to_client, to_store) = fanout::split(origin_response.bytes_stream(), DEFAULT_CAPACITY);
        tokio::spawn(fill(state.objects.clone(), key, to_store.boxed()));
        Body::from_stream(to_client)
    } else {
        warn!("Origin answered {status} for {key}, passing it through uncached");
        Body::from_stream(origin_response.bytes_stream())
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Some(content_length) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    }
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}

/// Stores one fan-out output. Runs detached from the request, so a client that
/// disconnects early doesn't stop the object from being written.
async fn fill(objects: Arc<dyn ObjectCache>, key: CacheKey, body: ObjectStream) {
    info!("Uploading {key} to object store");
    match objects.put_stream(&key, body).await {
        Ok(()) => info!("Upload of {key} complete"),
        Err(err) => error!("Failed to upload {key} to object store: {err}"),
    }
}

fn set_cache_headers(response: &mut Response) {
    let cache_control = format!("public, max-age={}", MAX_CACHE_AGE.as_secs());
    let expires = DateTime::now().saturating_add(MAX_CACHE_AGE).to_http_date();
    let headers = response.headers_mut();
    for (name, value) in [(CACHE_CONTROL, cache_control), (EXPIRES, expires)] {
        match HeaderValue::try_from(value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(err) => warn!("Skipping {name} header: {err}"),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::api;
    use crate::content::key::CacheKey;
    use crate::content::link::encode_file_id;
    use crate::content::object::ObjectCache;
    use crate::test::*;
    use axum::body::Body;
    use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES};
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const FILE_PATH: &str = "/data/a1/b2/a1b2c3.png";

    fn file_bytes() -> Vec<u8> {
        (0..200_000u32).map(|index| (index % 251) as u8).collect()
    }

    async fn get(state: &crate::app::AppState, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let response = api::routes(state.clone()).oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes().to_vec();
        (parts.status, parts.headers, body)
    }

    fn proxy_uri(state: &crate::app::AppState, origin: &str) -> String {
        let link = state.signer.proxy_link(&state.config, origin);
        let path = link.strip_prefix("https://cache.example.net").unwrap();
        path.to_owned()
    }

    #[tokio::test]
    async fn miss_fetches_once_and_fills() {
        let upstream = Upstream::spawn().await;
        upstream.respond(FILE_PATH, StubResponse::ok(file_bytes()));
        let (state, objects, _) = test_state(&upstream.url);
        let origin = format!("{}{FILE_PATH}", upstream.url);
        let key = CacheKey::from_origin(&origin).unwrap();

        let (status, headers, body) = get(&state, &proxy_uri(&state, &origin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, file_bytes());
        assert_eq!(headers[CONTENT_LENGTH], "200000");
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=3600");
        assert!(headers.contains_key(EXPIRES));

        let stored = objects.wait_for(&key).await;
        assert_eq!(stored, file_bytes());
        assert_eq!(upstream.hits(FILE_PATH), 1);
        assert_eq!(objects.puts(), 1);
    }

    #[tokio::test]
    async fn hit_never_fetches() {
        let upstream = Upstream::spawn().await;
        let (state, objects, _) = test_state(&upstream.url);
        let origin = format!("{}{FILE_PATH}", upstream.url);
        objects.insert(&CacheKey::from_origin(&origin).unwrap(), b"cached bytes".to_vec());

        let (status, headers, body) = get(&state, &proxy_uri(&state, &origin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"cached bytes");
        assert_eq!(headers[CONTENT_TYPE], "image/png");
        assert_eq!(headers[CONTENT_LENGTH], "12");
        assert_eq!(upstream.hits(FILE_PATH), 0);
        assert_eq!(objects.puts(), 0);
    }

    #[tokio::test]
    async fn second_request_is_a_hit() {
        let upstream = Upstream::spawn().await;
        upstream.respond(FILE_PATH, StubResponse::ok(file_bytes()));
        let (state, objects, _) = test_state(&upstream.url);
        let origin = format!("{}{FILE_PATH}", upstream.url);
        let uri = proxy_uri(&state, &origin);

        get(&state, &uri).await;
        objects.wait_for(&CacheKey::from_origin(&origin).unwrap()).await;
        let (status, _, body) = get(&state, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, file_bytes());
        assert_eq!(upstream.hits(FILE_PATH), 1);
    }

    #[tokio::test]
    async fn origin_errors_are_not_cached() {
        let upstream = Upstream::spawn().await;
        let (state, objects, _) = test_state(&upstream.url);
        let origin = format!("{}{FILE_PATH}", upstream.url);

        let (status, _, _) = get(&state, &proxy_uri(&state, &origin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(upstream.hits(FILE_PATH), 1);
        assert!(!objects.exists(&CacheKey::from_origin(&origin).unwrap()).await.unwrap());
        assert_eq!(objects.puts(), 0);
    }

    #[tokio::test]
    async fn unreachable_origin() {
        let (state, objects, _) = test_state("http://127.0.0.1:9");
        let origin = format!("http://127.0.0.1:9{FILE_PATH}");
        let (status, _, _) = get(&state, &proxy_uri(&state, &origin)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(objects.puts(), 0);
    }

    #[tokio::test]
    async fn rejects_bad_links() {
        let upstream = Upstream::spawn().await;
        upstream.respond(FILE_PATH, StubResponse::ok(file_bytes()));
        let (state, _, _) = test_state(&upstream.url);
        let origin = format!("{}{FILE_PATH}", upstream.url);
        let file_id = encode_file_id(&origin);
        let signature = state.signer.sign(origin.as_bytes());

        let missing = format!("/proxy/{file_id}");
        let empty = format!("/proxy/{file_id}?sig=");
        let forged = format!("/proxy/{file_id}?sig={}", state.signer.sign(b"something else"));
        let garbled = format!("/proxy/{file_id}?sig=%25%25%25");
        let bad_id = format!("/proxy/%25%25%25?sig={signature}");
        for uri in [missing, empty, forged, garbled, bad_id] {
            let (status, _, _) = get(&state, &uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }

        let unmarked = format!("{}/files/a1.png", upstream.url);
        let (status, _, _) = get(&state, &proxy_uri(&state, &unmarked)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(upstream.hits(FILE_PATH), 0);
    }

    #[tokio::test]
    async fn failed_probe_falls_back_to_origin() {
        let upstream = Upstream::spawn().await;
        upstream.respond(FILE_PATH, StubResponse::ok(file_bytes()));
        let (state, objects, _) = test_state(&upstream.url);
        objects.fail_probes();
        let origin = format!("{}{FILE_PATH}", upstream.url);

        let (status, _, body) = get(&state, &proxy_uri(&state, &origin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, file_bytes());
        assert_eq!(upstream.hits(FILE_PATH), 1);
    }
}
