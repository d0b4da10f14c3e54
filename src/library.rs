// ABOUTME: Song library use cases behind the HTTP routes
// ABOUTME: Lists songs for the configured layout and relays presigned asset URLs

use crate::error::{KaraokeError, Result};
use crate::karaoke::{asset_keys, songs_from_keys, validate_song_key, SongLayout, SongUrl, SongUrls};
use crate::storage::SongStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct SongLibrary {
    store: Arc<dyn SongStore>,
    layout: SongLayout,
    prefix: String,
    expires: Duration,
}

impl SongLibrary {
    pub fn new(store: Arc<dyn SongStore>, layout: SongLayout, prefix: impl Into<String>, expires: Duration) -> Self {
        Self {
            store,
            layout,
            prefix: prefix.into(),
            expires,
        }
    }

    pub fn layout(&self) -> SongLayout {
        self.layout
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fresh song list from the bucket. Nothing is cached between calls.
    pub async fn list_songs(&self) -> Result<Vec<String>> {
        let keys = self.store.list_keys(&self.prefix).await?;
        let songs = songs_from_keys(self.layout, &self.prefix, &keys);
        info!("Listed {} songs ({} objects) under '{}'", songs.len(), keys.len(), self.prefix);
        Ok(songs)
    }

    /// Signed URL of a song archive
    pub async fn song_url(&self, key: Option<&str>) -> Result<SongUrl> {
        if self.layout != SongLayout::Archive {
            return Err(KaraokeError::BadRequest(
                "Songs are stored as separate audio and graphics files, use /api/get-song-urls".into(),
            ));
        }
        let key = validate_song_key(self.layout, &self.prefix, key)?;
        let url = self.store.presign_get(key, self.expires).await?;
        info!("Signed archive URL for {} ({}s)", key, self.expires.as_secs());
        Ok(SongUrl { url })
    }

    /// Signed URLs of the audio and graphics assets of a song
    pub async fn song_urls(&self, key: Option<&str>) -> Result<SongUrls> {
        if self.layout != SongLayout::Paired {
            return Err(KaraokeError::BadRequest(
                "Songs are stored as archives, use /api/song-url".into(),
            ));
        }
        let key = validate_song_key(self.layout, &self.prefix, key)?;
        let (mp3_key, cdg_key) = asset_keys(key);

        let (mp3_url, cdg_url) = tokio::try_join!(
            self.store.presign_get(&mp3_key, self.expires),
            self.store.presign_get(&cdg_key, self.expires),
        )?;
        info!("Signed asset URLs for {} ({}s)", key, self.expires.as_secs());
        Ok(SongUrls { mp3_url, cdg_url })
    }
}
