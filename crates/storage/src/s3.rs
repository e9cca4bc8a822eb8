//! S3-backed object store.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use slidereel_core::error::StorageError;
use slidereel_core::ports::ObjectStore;

/// Maximum keys per DeleteObjects request.
const DELETE_BATCH: usize = 1000;

/// `ObjectStore` over an S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    /// Base URL objects are publicly served from (CDN or bucket
    /// website endpoint), without a trailing slash.
    public_base: String,
}

impl S3ObjectStore {
    /// Build a store from the ambient AWS environment (credentials,
    /// region).
    pub async fn from_env(bucket: impl Into<String>, public_base: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::with_client(aws_sdk_s3::Client::new(&config), bucket, public_base)
    }

    pub fn with_client(
        client: aws_sdk_s3::Client,
        bucket: impl Into<String>,
        public_base: impl Into<String>,
    ) -> Self {
        let public_base: String = public_base.into();
        Self {
            client,
            bucket: bucket.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

fn backend_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(backend_err)?;

        let data = output.body.collect().await.map_err(backend_err)?;
        Ok(data.into_bytes().to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(backend_err)?;
            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StorageError> {
        for chunk in keys.chunks(DELETE_BATCH) {
            let objects: Vec<ObjectIdentifier> = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<_, _>>()
                .map_err(backend_err)?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(backend_err)?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(backend_err)?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
