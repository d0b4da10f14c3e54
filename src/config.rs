// ABOUTME: Environment configuration for the karaoke song service
// ABOUTME: Object-store endpoint, credentials, bucket, song layout and HTTP binding

use crate::error::{KaraokeError, Result};
use crate::karaoke::SongLayout;
use std::env;
use std::time::Duration;

/// Default lifetime of presigned URLs
const DEFAULT_PRESIGN_EXPIRES_SECS: u64 = 30;

/// S3 refuses presigned URLs valid for longer than 7 days
const MAX_PRESIGN_EXPIRES_SECS: u64 = 604_800;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Custom endpoint for S3-compatible stores (Spaces, MinIO, R2...)
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub layout: SongLayout,
    pub prefix: String,
    pub presign_expires: Duration,
    pub static_dir: String,
    pub bind_addr: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            var(name).ok_or_else(|| KaraokeError::Config(format!("{} is not set", name)))
        };

        let layout = match var("SONG_LAYOUT") {
            Some(raw) => raw.parse::<SongLayout>()?,
            None => SongLayout::default(),
        };

        let prefix = lookup("SONG_PREFIX").unwrap_or_else(|| layout.default_prefix().to_string());

        let presign_expires_secs = var("PRESIGN_EXPIRES_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_PRESIGN_EXPIRES_SECS)
            .clamp(1, MAX_PRESIGN_EXPIRES_SECS);

        Ok(Self {
            storage: StorageConfig {
                endpoint: var("S3_ENDPOINT"),
                region: var("S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                access_key_id: required("S3_ACCESS_KEY_ID")?,
                secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
                bucket: required("S3_BUCKET_NAME")?,
            },
            layout,
            prefix,
            presign_expires: Duration::from_secs(presign_expires_secs),
            static_dir: var("STATIC_DIR").unwrap_or_else(|| "public".to_string()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
