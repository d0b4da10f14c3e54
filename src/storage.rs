// ABOUTME: Object storage access for song assets
// ABOUTME: Lists keys and mints presigned GET URLs on S3-compatible stores

use crate::config::StorageConfig;
use crate::error::{KaraokeError, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::time::Duration;
use tracing::debug;

/// Read-only view of the bucket holding the songs
#[async_trait]
pub trait SongStore: Send + Sync {
    /// All object keys under `prefix`, in store order
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Time-limited GET URL for `key`. The object is not checked for existence.
    async fn presign_get(&self, key: &str, expires: Duration) -> Result<String>;
}

#[derive(Clone)]
pub struct S3SongStore {
    client: Client,
    bucket: String,
}

impl S3SongStore {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "karaoke-env",
        );

        let mut builder = S3ConfigBuilder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        // Custom endpoints are addressed path-style: <endpoint>/<bucket>/<key>
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl SongStore for S3SongStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        let mut page_count = 0usize;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                KaraokeError::Storage(format!(
                    "Failed to list s3://{}/{}: {}",
                    self.bucket,
                    prefix,
                    DisplayErrorContext(e)
                ))
            })?;
            page_count += 1;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }

        debug!(
            "Listed {} keys under s3://{}/{} in {} pages",
            keys.len(),
            self.bucket,
            prefix,
            page_count
        );
        Ok(keys)
    }

    async fn presign_get(&self, key: &str, expires: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires)
            .map_err(|e| KaraokeError::Storage(format!("Invalid presign expiry: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                KaraokeError::Storage(format!(
                    "Failed to presign {}: {}",
                    key,
                    DisplayErrorContext(e)
                ))
            })?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::sync::Mutex;

    /// In-memory bucket. Presigned URLs are fake but carry key and expiry.
    #[derive(Default)]
    pub struct MemorySongStore {
        keys: Vec<String>,
        unavailable: bool,
        presigned: Mutex<Vec<String>>,
    }

    impl MemorySongStore {
        pub fn with_keys(keys: &[&str]) -> Self {
            Self {
                keys: keys.iter().map(|k| k.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Default::default()
            }
        }

        /// Keys presigned so far, in call order
        pub fn presigned(&self) -> Vec<String> {
            self.presigned.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SongStore for MemorySongStore {
        async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
            if self.unavailable {
                return Err(KaraokeError::Storage("bucket unavailable".into()));
            }
            Ok(self
                .keys
                .iter()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }

        async fn presign_get(&self, key: &str, expires: Duration) -> Result<String> {
            if self.unavailable {
                return Err(KaraokeError::Storage("bucket unavailable".into()));
            }
            self.presigned.lock().unwrap().push(key.to_string());
            Ok(format!(
                "https://songs.test/{}?X-Amz-Expires={}",
                key,
                expires.as_secs()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::header;
    use axum::response::IntoResponse;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn storage_config(endpoint: Option<&str>) -> StorageConfig {
        StorageConfig {
            endpoint: endpoint.map(str::to_string),
            region: "us-east-1".into(),
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            bucket: "karaoke".into(),
        }
    }

    #[tokio::test]
    async fn test_presign_is_local_and_signed() {
        let store = S3SongStore::new(&storage_config(Some("http://localhost:9000")));
        let url = store
            .presign_get("ZIP/Queen - Bohemian Rhapsody.zip", Duration::from_secs(30))
            .await
            .unwrap();

        assert!(url.starts_with("http://localhost:9000/karaoke/ZIP/"));
        assert!(url.contains("X-Amz-Expires=30"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Credential=AKIDEXAMPLE"));
    }

    #[tokio::test]
    async fn test_memory_store_filters_by_prefix() {
        let store = memory::MemorySongStore::with_keys(&["ZIP/a.zip", "CDG/a.cdg"]);
        assert_eq!(store.list_keys("ZIP/").await.unwrap(), vec!["ZIP/a.zip"]);
        assert!(memory::MemorySongStore::unavailable()
            .list_keys("")
            .await
            .is_err());
    }

    type SeenTokens = Arc<Mutex<Vec<Option<String>>>>;

    fn list_page(keys: &[&str], next_token: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|k| format!("<Contents><Key>{}</Key><Size>1</Size></Contents>", k))
            .collect();
        let truncation = match next_token {
            Some(token) => format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{}</NextContinuationToken>",
                token
            ),
            None => "<IsTruncated>false</IsTruncated>".to_string(),
        };
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Name>karaoke</Name><Prefix>ZIP/</Prefix><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys>\
             {}{}</ListBucketResult>",
            keys.len(),
            truncation,
            contents
        )
    }

    /// ListObjectsV2 over two pages, recording the continuation token of each call
    async fn fake_list_objects(
        State(seen): State<SeenTokens>,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let token = query.get("continuation-token").cloned();
        seen.lock().unwrap().push(token.clone());
        let body = match token.as_deref() {
            None => list_page(&["ZIP/a.zip", "ZIP/b.zip"], Some("page-2")),
            _ => list_page(&["ZIP/c.zip"], None),
        };
        ([(header::CONTENT_TYPE, "application/xml")], body)
    }

    #[tokio::test]
    async fn test_list_keys_follows_continuation_tokens() {
        let seen = SeenTokens::default();
        let app = Router::new()
            .fallback(fake_list_objects)
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let store = S3SongStore::new(&storage_config(Some(&endpoint)));
        let keys = store.list_keys("ZIP/").await.unwrap();

        assert_eq!(keys, vec!["ZIP/a.zip", "ZIP/b.zip", "ZIP/c.zip"]);
        assert_eq!(*seen.lock().unwrap(), vec![None, Some("page-2".to_string())]);
    }
}
