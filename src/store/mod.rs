pub mod comment;
pub mod pool;
pub mod post;

use crate::db::ConnectionPool;
use crate::model::comment::Comment;
use crate::model::enums::Rating;
use crate::model::pool::Pool;
use crate::model::post::Post;
use async_trait::async_trait;
use diesel::PgConnection;
use std::time::Duration;
use tokio::task::JoinError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum StoreError {
    FailedConnection(#[from] diesel::r2d2::PoolError),
    FailedQuery(diesel::result::Error),
    Join(#[from] JoinError),
    #[error("Post {0} not found")]
    PostNotFound(i64),
    #[error("Metadata store did not respond within {0:?}")]
    Timeout(Duration),
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        Self::FailedQuery(value)
    }
}

/// Filters for [`MetadataStore::search_posts`]. A zero score or an empty tag list
/// places no constraint on that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostSearch {
    pub min_score_total: i32,
    pub rating: Option<Rating>,
    pub general_tags: Vec<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Durable storage for metadata observed in upstream responses.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_post(&self, id: i64) -> StoreResult<Post>;

    /// Inserts unconditionally. Fails if a post with the same id exists.
    async fn insert_post(&self, post: &Post) -> StoreResult<()>;

    /// Inserts `post` unless its id is already stored. Returns whether a row was written.
    async fn check_and_insert_post(&self, post: &Post) -> StoreResult<bool>;

    /// Overwrites every column of the stored post, stamping the update time with now.
    async fn update_post(&self, post: &Post) -> StoreResult<()>;

    async fn delete_post(&self, id: i64) -> StoreResult<()>;

    /// Writes the pool and replaces its membership sequence in one transaction.
    async fn upsert_pool(&self, pool: &Pool) -> StoreResult<()>;

    /// Inserts each comment, skipping ids that already exist. Stops at the first
    /// other error. Returns the number of new rows.
    async fn insert_comments(&self, comments: &[Comment]) -> StoreResult<usize>;

    async fn search_posts(&self, search: &PostSearch) -> StoreResult<Vec<Post>>;
}

/// PostgreSQL-backed [`MetadataStore`]. Diesel calls run on the blocking thread pool
/// and are abandoned after `deadline`; the session statement timeout cancels them
/// on the server side.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: ConnectionPool,
    deadline: Duration,
}

impl PgMetadataStore {
    pub fn new(pool: ConnectionPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    async fn run<F, R>(&self, operation: F) -> StoreResult<R>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            operation(&mut conn)
        });
        match tokio::time::timeout(self.deadline, task).await {
            Ok(result) => result?,
            Err(_) => Err(StoreError::Timeout(self.deadline)),
        }
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn get_post(&self, id: i64) -> StoreResult<Post> {
        self.run(move |conn| post::get(conn, id)).await
    }

    async fn insert_post(&self, post: &Post) -> StoreResult<()> {
        let post = post.clone();
        self.run(move |conn| post::insert(conn, &post).map_err(StoreError::from))
            .await
    }

    async fn check_and_insert_post(&self, post: &Post) -> StoreResult<bool> {
        let post = post.clone();
        self.run(move |conn| post::check_and_insert(conn, &post).map_err(StoreError::from))
            .await
    }

    async fn update_post(&self, post: &Post) -> StoreResult<()> {
        let post = post.clone();
        self.run(move |conn| post::update(conn, &post)).await
    }

    async fn delete_post(&self, id: i64) -> StoreResult<()> {
        self.run(move |conn| post::delete(conn, id)).await
    }

    async fn upsert_pool(&self, pool: &Pool) -> StoreResult<()> {
        let pool = pool.clone();
        self.run(move |conn| pool::upsert(conn, &pool).map_err(StoreError::from))
            .await
    }

    async fn insert_comments(&self, comments: &[Comment]) -> StoreResult<usize> {
        let comments = comments.to_vec();
        self.run(move |conn| comment::insert_all(conn, &comments).map_err(StoreError::from))
            .await
    }

    async fn search_posts(&self, search: &PostSearch) -> StoreResult<Vec<Post>> {
        let search = search.clone();
        self.run(move |conn| post::search(conn, &search).map_err(StoreError::from))
            .await
    }
}
