use crate::config::ObjectStoreConfig;
use crate::content::key::CacheKey;
use crate::content::object::{ObjectCache, ObjectCacheError, ObjectResult, ObjectStream};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;

/// [`ObjectCache`] backed by an S3-compatible bucket.
pub struct S3ObjectCache {
    client: Client,
    bucket: String,
    part_size: usize,
}

impl S3ObjectCache {
    /// Builds a client for the configured bucket. Static keys are used when both are
    /// given, otherwise credentials come from the environment. A custom endpoint
    /// implies path-style addressing, which MinIO and most other S3 clones expect.
    pub async fn new(config: &ObjectStoreConfig) -> Self {
        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::adaptive().with_max_attempts(MAX_ATTEMPTS));

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "static");
                builder = builder.credentials_provider(credentials);
            }
            _ => {
                let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
                if let Some(credentials) = sdk_config.credentials_provider() {
                    builder = builder.credentials_provider(credentials);
                }
            }
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            part_size: config.part_size,
        }
    }

    async fn put_single(&self, key: &CacheKey, body: Bytes) -> ObjectResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(key.mime_type().to_string())
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(request_error)?;
        Ok(())
    }

    async fn put_multipart(&self, key: &CacheKey, first_part: Bytes, body: &mut ObjectStream) -> ObjectResult<()> {
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(key.mime_type().to_string())
            .send()
            .await
            .map_err(request_error)?;
        let upload_id = upload
            .upload_id()
            .ok_or_else(|| ObjectCacheError::Request(String::from("Multipart upload has no id")))?;

        match self.upload_parts(key, upload_id, first_part, body).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key.as_str())
                    .upload_id(upload_id)
                    .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
                    .send()
                    .await
                    .map_err(request_error)?;
                Ok(())
            }
            Err(err) => {
                // Uploaded parts linger in the bucket until the upload is aborted.
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key.as_str())
                    .upload_id(upload_id)
                    .send()
                    .await
                {
                    warn!("Failed to abort upload of {key}: {}", DisplayErrorContext(&abort_err));
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &CacheKey,
        upload_id: &str,
        first_part: Bytes,
        body: &mut ObjectStream,
    ) -> ObjectResult<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        let mut part = first_part;
        let mut part_number = 1;
        while !part.is_empty() {
            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key.as_str())
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(part))
                .send()
                .await
                .map_err(request_error)?;
            parts.push(
                CompletedPart::builder()
                    .set_e_tag(output.e_tag().map(str::to_owned))
                    .part_number(part_number)
                    .build(),
            );

            part = read_part(body, self.part_size).await?;
            part_number += 1;
        }
        Ok(parts)
    }
}

#[async_trait]
impl ObjectCache for S3ObjectCache {
    async fn exists(&self, key: &CacheKey) -> ObjectResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|err| err.is_not_found()) => Ok(false),
            Err(err) => Err(request_error(err)),
        }
    }

    async fn content_length(&self, key: &CacheKey) -> ObjectResult<u64> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.is_not_found() => ObjectCacheError::NotFound(key.clone()),
                _ => request_error(err),
            })?;
        output
            .content_length()
            .and_then(|length| u64::try_from(length).ok())
            .ok_or_else(|| ObjectCacheError::Request(format!("Object '{key}' has no valid content length")))
    }

    async fn get_stream(&self, key: &CacheKey) -> ObjectResult<ObjectStream> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.is_no_such_key() => ObjectCacheError::NotFound(key.clone()),
                _ => request_error(err),
            })?;
        Ok(ReaderStream::new(output.body.into_async_read()).boxed())
    }

    /// Bodies smaller than one part go up in a single request. Larger ones use a
    /// multipart upload that is aborted if the body or any part fails.
    async fn put_stream(&self, key: &CacheKey, mut body: ObjectStream) -> ObjectResult<()> {
        let first_part = read_part(&mut body, self.part_size).await?;
        if first_part.len() < self.part_size {
            return self.put_single(key, first_part).await;
        }
        self.put_multipart(key, first_part, &mut body).await
    }
}

/// Buffers chunks from `body` until at least `part_size` bytes are held or the body ends.
async fn read_part(body: &mut ObjectStream, part_size: usize) -> ObjectResult<Bytes> {
    let mut part = BytesMut::with_capacity(part_size);
    while part.len() < part_size {
        match body.next().await {
            Some(chunk) => part.extend_from_slice(&chunk?),
            None => break,
        }
    }
    Ok(part.freeze())
}

fn request_error<E: std::error::Error>(err: E) -> ObjectCacheError {
    ObjectCacheError::Request(DisplayErrorContext(err).to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::stream;
    use std::io;

    fn body(chunks: &[&'static [u8]]) -> ObjectStream {
        stream::iter(chunks.to_vec().into_iter().map(|chunk| Ok(Bytes::from_static(chunk)))).boxed()
    }

    #[tokio::test]
    async fn parts_are_filled_before_yielding() {
        let mut stream = body(&[b"abc", b"defg", b"hi", b"j"]);
        assert_eq!(read_part(&mut stream, 5).await.unwrap(), "abcdefg");
        assert_eq!(read_part(&mut stream, 5).await.unwrap(), "hij");
        assert!(read_part(&mut stream, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn body_errors_surface() {
        let mut stream = stream::iter([Ok(Bytes::from_static(b"ab")), Err(io::Error::other("reset"))]).boxed();
        assert!(matches!(read_part(&mut stream, 8).await, Err(ObjectCacheError::Body(_))));
    }
}
