// ABOUTME: Client side of the karaoke player
// ABOUTME: Fetches the song list, validates selections and downloads song assets via signed URLs

use crate::error::KaraokeError;
use crate::karaoke::{song_title, SongLayout, SongUrl, SongUrls, AUDIO_EXTENSION, GRAPHICS_EXTENSION};
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Song list as last returned by the server, with the server's layout
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    layout: SongLayout,
    songs: Vec<String>,
}

impl SongCatalog {
    pub fn new(layout: SongLayout, songs: Vec<String>) -> Self {
        Self { layout, songs }
    }

    pub fn layout(&self) -> SongLayout {
        self.layout
    }

    pub fn songs(&self) -> &[String] {
        &self.songs
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Accept only keys of the most recent listing, compared verbatim
    pub fn select<'a>(&self, key: &'a str) -> std::result::Result<&'a str, KaraokeError> {
        if key.is_empty() || !self.songs.iter().any(|song| song == key) {
            return Err(KaraokeError::UnknownSong(key.to_string()));
        }
        Ok(key)
    }
}

/// Assets of one song, ready for the player
#[derive(Debug, Clone)]
pub enum DownloadedSong {
    Archive { title: String, archive: Bytes },
    Paired { title: String, audio: Bytes, graphics: Bytes },
}

impl DownloadedSong {
    pub fn title(&self) -> &str {
        match self {
            DownloadedSong::Archive { title, .. } | DownloadedSong::Paired { title, .. } => title,
        }
    }

    /// Write the assets into `dir`, returning the created files
    pub async fn save(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let files: Vec<(PathBuf, &Bytes)> = match self {
            DownloadedSong::Archive { title, archive } => {
                vec![(dir.join(format!("{}.zip", title)), archive)]
            }
            DownloadedSong::Paired { title, audio, graphics } => vec![
                (dir.join(format!("{}{}", title, AUDIO_EXTENSION)), audio),
                (dir.join(format!("{}{}", title, GRAPHICS_EXTENSION)), graphics),
            ],
        };

        let mut written = Vec::with_capacity(files.len());
        for (path, data) in files {
            tokio::fs::write(&path, data)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// The part of `GET /health` the client needs
#[derive(Debug, Deserialize)]
struct ServerHealth {
    layout: SongLayout,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Song layout reported by `GET /health`
    pub async fn layout(&self) -> Result<SongLayout> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Could not reach the karaoke server")?;
        if !response.status().is_success() {
            return Err(anyhow!("Karaoke server is unhealthy: {}", response.status()));
        }
        let health: ServerHealth = response.json().await.context("Malformed health response")?;
        Ok(health.layout)
    }

    /// GET /api/songs, tagged with the server's layout
    pub async fn songs(&self) -> Result<SongCatalog> {
        let layout = self.layout().await?;
        let url = format!("{}/api/songs", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Could not get the song list from the server")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "Could not get the song list from the server: {}",
                response.status()
            ));
        }
        let songs: Vec<String> = response.json().await.context("Malformed song list")?;
        Ok(SongCatalog::new(layout, songs))
    }

    /// GET /api/song-url
    pub async fn song_url(&self, key: &str) -> Result<SongUrl> {
        self.signed(&format!("{}/api/song-url", self.base_url), key).await
    }

    /// GET /api/get-song-urls
    pub async fn song_urls(&self, key: &str) -> Result<SongUrls> {
        self.signed(&format!("{}/api/get-song-urls", self.base_url), key).await
    }

    async fn signed<T: serde::de::DeserializeOwned>(&self, url: &str, key: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(&[("key", key)])
            .send()
            .await
            .context("Could not get the song URLs")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Could not get the song URLs: {} {}", status, body));
        }
        Ok(response.json().await.context("Malformed signed URL response")?)
    }

    /// Validate `input` against `catalog`, then sign and download the song.
    ///
    /// Archive libraries yield one download. Paired libraries download the
    /// audio and the graphics concurrently; either failing fails the whole song.
    pub async fn fetch_song(&self, catalog: &SongCatalog, input: &str) -> Result<DownloadedSong> {
        let key = catalog.select(input)?;
        let title = song_title(key).to_string();

        if catalog.layout() == SongLayout::Archive {
            let signed = self.song_url(key).await?;
            let archive = self.download(&signed.url).await?;
            info!("Downloaded {} ({} bytes)", key, archive.len());
            return Ok(DownloadedSong::Archive { title, archive });
        }

        let signed = self.song_urls(key).await?;
        let (audio, graphics) = tokio::try_join!(
            self.download(&signed.mp3_url),
            self.download(&signed.cdg_url),
        )
        .context("Error downloading files")?;
        info!(
            "Downloaded {} (audio {} bytes, graphics {} bytes)",
            key,
            audio.len(),
            graphics.len()
        );
        Ok(DownloadedSong::Paired { title, audio, graphics })
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            warn!("Download failed with {}", response.status());
            return Err(anyhow!("Download failed with status {}", response.status()));
        }
        Ok(response.bytes().await?)
    }
}
