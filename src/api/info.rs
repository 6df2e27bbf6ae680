use crate::app::AppState;
use axum::extract::State;

pub async fn get_info(State(state): State<AppState>) -> String {
    let public_url = state.config.public_url.as_str().trim_end_matches('/');
    format!(
        "e6-cache is running. Use this as the instance in your preferred client.\n\
         Make sure to set the base URL in your client to: {public_url}\n\
         Server is caching following url: {}",
        state.config.upstream_url
    )
}

#[cfg(test)]
mod test {
    use crate::api;
    use crate::test::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn status_page() {
        let (state, _, _) = test_state("http://localhost:9999");
        let request = Request::get("/").body(Body::empty()).unwrap();
        let response = api::routes(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("base URL in your client to: https://cache.example.net\n"));
        assert!(body.ends_with("http://localhost:9999/"));
    }
}
