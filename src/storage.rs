use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Result of an avatar/resume upload.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub url: String,
    pub original_filename: String,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn upload(
        &self,
        folder: &str,
        original_filename: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<StoredObject>;
}

/// S3/MinIO-backed storage, path-style addressing.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig, region: &str) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn upload(
        &self,
        folder: &str,
        original_filename: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<StoredObject> {
        let key = format!("{}/{}-{}", folder, Uuid::new_v4(), original_filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(StoredObject {
            url: format!("{}/{}/{}", self.endpoint, self.bucket, key),
            original_filename: original_filename.to_string(),
        })
    }
}
