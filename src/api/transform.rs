use crate::api::{ApiError, ApiResult};
use crate::app::AppState;
use crate::config::STORE_DEADLINE;
use crate::error::ErrorKind;
use crate::model::comment::CommentList;
use crate::model::pool::Pool;
use crate::model::post::{Post, PostList, SinglePost};
use crate::store::StoreResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::{debug, info, warn};

const POST_ID_FILTER: &str = "search[post_id]";

/// Shape of an upstream response, decided by the route it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    PostComments,
    PostList,
    SinglePost,
    PoolList,
    SinglePool,
    PassThrough,
}

impl RouteKind {
    /// The first matching rule wins. Comment listings without a post filter come
    /// back from the upstream as post listings, so they are handled as such.
    pub fn classify(path: &str, query: Option<&str>) -> Self {
        if path.ends_with("/comments.json") && has_post_filter(query) {
            Self::PostComments
        } else if path.ends_with("/posts.json") || path.ends_with("/comments.json") {
            Self::PostList
        } else if path.starts_with("/posts/") {
            Self::SinglePost
        } else if path.ends_with("/pools.json") {
            Self::PoolList
        } else if path.contains("/pools/") {
            Self::SinglePool
        } else {
            Self::PassThrough
        }
    }
}

/// Records the metadata in `body` and points its media URLs at this proxy.
/// Persistence failures are logged and don't affect the returned body.
pub async fn apply(state: &AppState, route: RouteKind, body: Vec<u8>) -> ApiResult<Vec<u8>> {
    match route {
        RouteKind::PassThrough => Ok(body),
        RouteKind::PostComments => {
            let list: CommentList = parse(&body)?;
            info!("Saving {} comments", list.comments().len());
            persist(state.metadata.insert_comments(list.comments()), "comments").await;
            serialize(&list)
        }
        RouteKind::PostList => {
            let mut list: PostList = parse(&body)?;
            for post in &mut list.posts {
                process_post(state, post).await;
            }
            serialize(&list)
        }
        RouteKind::SinglePost => {
            let mut single: SinglePost = parse(&body)?;
            process_post(state, &mut single.post).await;
            serialize(&single)
        }
        RouteKind::PoolList => {
            let pools: Vec<Pool> = parse(&body)?;
            for pool in &pools {
                persist(state.metadata.upsert_pool(pool), &format!("pool {}", pool.id)).await;
            }
            serialize(&pools)
        }
        RouteKind::SinglePool => {
            let pool: Pool = parse(&body)?;
            persist(state.metadata.upsert_pool(&pool), &format!("pool {}", pool.id)).await;
            serialize(&pool)
        }
    }
}

async fn process_post(state: &AppState, post: &mut Post) {
    if let Some(true) = persist(state.metadata.check_and_insert_post(post), &format!("post {}", post.id)).await {
        debug!("Stored new post {}", post.id);
    }

    for url in [&mut post.file.url, &mut post.preview.url, &mut post.sample.url] {
        if let Some(origin) = url.as_mut().filter(|origin| !origin.is_empty()) {
            *origin = state.signer.proxy_link(&state.config, origin.as_str());
        }
    }
}

/// Awaits a metadata write under the store deadline. Returns `None` if it failed.
async fn persist<T>(operation: impl Future<Output = StoreResult<T>>, what: &str) -> Option<T> {
    match tokio::time::timeout(STORE_DEADLINE, operation).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            warn!("Failed to persist {what} ({}): {err}", err.kind());
            None
        }
        Err(_) => {
            warn!("Persisting {what} timed out after {STORE_DEADLINE:?}");
            None
        }
    }
}

fn has_post_filter(query: Option<&str>) -> bool {
    query.is_some_and(|query| {
        url::form_urlencoded::parse(query.as_bytes()).any(|(key, value)| key == POST_ID_FILTER && !value.is_empty())
    })
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(ApiError::InvalidResponseFormat)
}

fn serialize<T: Serialize>(value: &T) -> ApiResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(ApiError::from)
}
