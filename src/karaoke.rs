// ABOUTME: Karaoke song types and key conventions
// ABOUTME: Archive (.zip) and paired (.mp3 + .cdg) layouts, key validation and search

use crate::error::{KaraokeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const ARCHIVE_EXTENSION: &str = ".zip";
pub const AUDIO_EXTENSION: &str = ".mp3";
pub const GRAPHICS_EXTENSION: &str = ".cdg";

/// How a song's assets are laid out in the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongLayout {
    /// One `.zip` object per song holding both the audio and the graphics
    #[default]
    Archive,
    /// Two sibling objects `<key>.mp3` and `<key>.cdg` per song
    Paired,
}

impl SongLayout {
    pub fn default_prefix(&self) -> &'static str {
        match self {
            SongLayout::Archive => "ZIP/",
            SongLayout::Paired => "",
        }
    }
}

impl FromStr for SongLayout {
    type Err = KaraokeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "archive" | "zip" => Ok(SongLayout::Archive),
            "paired" | "pair" => Ok(SongLayout::Paired),
            other => Err(KaraokeError::Config(format!(
                "unknown SONG_LAYOUT '{}', expected 'archive' or 'paired'",
                other
            ))),
        }
    }
}

impl fmt::Display for SongLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongLayout::Archive => f.write_str("archive"),
            SongLayout::Paired => f.write_str("paired"),
        }
    }
}

/// Signed URL for a single song archive (`GET /api/song-url`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongUrl {
    pub url: String,
}

/// Signed URLs for the audio and graphics assets of a song (`GET /api/get-song-urls`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongUrls {
    pub mp3_url: String,
    pub cdg_url: String,
}

/// Query string accepted by the signing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SongKeyQuery {
    #[serde(default)]
    pub key: Option<String>,
}

fn has_suffix_ignore_case(key: &str, suffix: &str) -> bool {
    key.len() >= suffix.len()
        && key.is_char_boundary(key.len() - suffix.len())
        && key[key.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn strip_suffix_ignore_case<'a>(key: &'a str, suffix: &str) -> Option<&'a str> {
    if has_suffix_ignore_case(key, suffix) {
        Some(&key[..key.len() - suffix.len()])
    } else {
        None
    }
}

fn is_folder_marker(key: &str) -> bool {
    key.is_empty() || key.ends_with('/')
}

/// Turn a raw object listing into the song list for `layout`.
///
/// Archive songs keep the store's order. Paired songs are only listed when
/// both assets exist, and come back sorted by base key.
pub fn songs_from_keys<I, S>(layout: SongLayout, prefix: &str, keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let in_library = |key: &str| key.starts_with(prefix) && key != prefix && !is_folder_marker(key);

    match layout {
        SongLayout::Archive => keys
            .into_iter()
            .map(|k| k.as_ref().to_string())
            .filter(|k| in_library(k.as_str()) && has_suffix_ignore_case(k, ARCHIVE_EXTENSION))
            .collect(),
        SongLayout::Paired => {
            // (has audio, has graphics) per base key
            let mut assets: BTreeMap<String, (bool, bool)> = BTreeMap::new();
            for key in keys {
                let key = key.as_ref();
                let (base, is_audio) = if let Some(base) = strip_suffix_ignore_case(key, AUDIO_EXTENSION) {
                    (base, true)
                } else if let Some(base) = strip_suffix_ignore_case(key, GRAPHICS_EXTENSION) {
                    (base, false)
                } else {
                    continue;
                };
                // The base key is what gets listed and later signed
                if !in_library(base) {
                    continue;
                }
                let entry = assets.entry(base.to_string()).or_default();
                if is_audio {
                    entry.0 = true;
                } else {
                    entry.1 = true;
                }
            }
            assets
                .into_iter()
                .filter(|(_, (audio, graphics))| *audio && *graphics)
                .map(|(base, _)| base)
                .collect()
        }
    }
}

/// Object keys of the audio and graphics assets of a paired song
pub fn asset_keys(base: &str) -> (String, String) {
    (
        format!("{}{}", base, AUDIO_EXTENSION),
        format!("{}{}", base, GRAPHICS_EXTENSION),
    )
}

/// Check that `key` may name a song of the library before anything is signed
pub fn validate_song_key<'a>(layout: SongLayout, prefix: &str, key: Option<&'a str>) -> Result<&'a str> {
    // Keys are signed exactly as given; object keys may carry surrounding spaces
    let key = key.filter(|k| !k.is_empty()).ok_or(KaraokeError::MissingKey)?;

    if !key.starts_with(prefix) || key == prefix || is_folder_marker(key) {
        return Err(KaraokeError::InvalidKey(key.to_string()));
    }
    if key.split('/').any(|segment| segment == "..") {
        return Err(KaraokeError::InvalidKey(key.to_string()));
    }
    if layout == SongLayout::Archive && !has_suffix_ignore_case(key, ARCHIVE_EXTENSION) {
        return Err(KaraokeError::InvalidKey(key.to_string()));
    }

    Ok(key)
}

/// Display name of a song: last path segment without its extension
pub fn song_title(key: &str) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    strip_suffix_ignore_case(name, ARCHIVE_EXTENSION).unwrap_or(name)
}

/// Case-insensitive substring search, as the song search box does it
pub fn search<'a>(songs: &'a [String], query: &str) -> Vec<&'a str> {
    let needle = query.trim().to_lowercase();
    songs
        .iter()
        .map(String::as_str)
        .filter(|song| needle.is_empty() || song.to_lowercase().contains(&needle))
        .collect()
}
