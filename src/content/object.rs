use crate::content::key::CacheKey;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::io;
use std::time::Duration;

pub type ObjectResult<T> = Result<T, ObjectCacheError>;

/// A cached object's bytes, in order.
pub type ObjectStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Debug, thiserror::Error)]
pub enum ObjectCacheError {
    #[error("Object '{0}' does not exist")]
    NotFound(CacheKey),
    #[error("Object store request failed: {0}")]
    Request(String),
    #[error("Failed to read object body: {0}")]
    Body(#[from] io::Error),
    #[error("Object store did not respond within {0:?}")]
    Timeout(Duration),
}

/// Durable storage for cached file bytes, addressed by [`CacheKey`].
///
/// A missing object is an ordinary outcome: [`ObjectCache::exists`] reports it as
/// `false` and the other reads as [`ObjectCacheError::NotFound`]. Callers bound each
/// call with their own deadline.
#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn exists(&self, key: &CacheKey) -> ObjectResult<bool>;

    async fn content_length(&self, key: &CacheKey) -> ObjectResult<u64>;

    async fn get_stream(&self, key: &CacheKey) -> ObjectResult<ObjectStream>;

    /// Writes `body` under `key`. An object only becomes visible once the whole body
    /// has been stored.
    async fn put_stream(&self, key: &CacheKey, body: ObjectStream) -> ObjectResult<()>;
}
