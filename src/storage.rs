use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Presigned URLs handed to clients live this long.
pub const PRESIGN_TTL_SECS: u64 = 30 * 60;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn get_object(&self, key: &str) -> anyhow::Result<Bytes>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
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
            bucket: cfg.bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Bytes> {
        let out = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 get_object")?;
        let data = out.body.collect().await.context("read s3 object body")?;
        Ok(data.into_bytes())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        let req = self.client.get_object().bucket(&self.bucket).key(key);
        let presigned = req
            .presigned(PresigningConfig::expires_in(
                std::time::Duration::from_secs(seconds),
            )?)
            .await
            .context("s3 presign_get")?;
        Ok(presigned.uri().to_string())
    }
}

/// Builds `<prefix>/<owner>/<id>.<ext>`.
pub fn object_key(prefix: &str, owner: Uuid, id: Uuid, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("{}/{}/{}.{}", prefix, owner, id, ext)
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub fn is_image(ct: &str) -> bool {
    ext_from_mime(ct).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[test]
    fn object_key_layout() {
        let owner = Uuid::nil();
        let id = Uuid::from_u128(7);
        let key = object_key("images", owner, id, "image/png");
        assert_eq!(key, format!("images/{}/{}.png", owner, id));
        assert!(object_key("vlogs", owner, id, "text/plain").ends_with(".bin"));
    }
}
