//! Subtitle-related models.

use crate::error::Result;
use crate::utils::literal;
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A subtitle track descriptor, as listed by the tool for one language and format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// The extension of the subtitle file, e.g. 'vtt'.
    #[serde(rename = "ext")]
    pub extension: String,
    /// The URL of the subtitle file.
    pub url: String,
    /// The language of the subtitle file, e.g. 'English'.
    #[serde(default)]
    pub name: Option<String>,
}

/// The subtitle tracks of a video, keyed by language code.
pub type SubtitleTracks = BTreeMap<String, Vec<SubtitleTrack>>;

/// A subtitle track kept for a single language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct SubtitleEntry {
    /// The language code, e.g. 'en'.
    pub language: String,
    /// The display name of the track.
    pub name: Option<String>,
    /// The URL of the subtitle file.
    pub url: String,
}

/// A direct media URL along with its subtitles in one format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoWithSubtitles {
    /// The direct URL of the media.
    pub url: String,
    /// The subtitles, ordered by language code.
    pub subtitles: Vec<SubtitleEntry>,
}

/// Keeps, for each language, the first track with the given extension.
///
/// Languages without such a track are dropped. The comparison ignores case.
pub fn select_tracks(tracks: SubtitleTracks, extension: &str) -> Vec<SubtitleEntry> {
    tracks
        .into_iter()
        .filter_map(|(language, tracks)| {
            tracks
                .into_iter()
                .find(|track| track.extension.eq_ignore_ascii_case(extension))
                .map(|track| SubtitleEntry::new(language, track.name, track.url))
        })
        .collect()
}

/// Reads the subtitle literal printed by the tool.
///
/// Languages and descriptors that are not usable tracks are skipped one by one.
///
/// # Errors
///
/// This function will return an error if the literal cannot be parsed or does not map
/// language codes to track lists.
pub fn parse_tracks(blob: &str) -> Result<SubtitleTracks> {
    let value = literal::parse(blob.trim())?;
    let listing: BTreeMap<String, serde_json::Value> = serde_json::from_value(value)?;

    let tracks = listing
        .into_iter()
        .filter_map(|(language, descriptors)| match descriptors {
            serde_json::Value::Array(descriptors) => Some((language, read_descriptors(descriptors))),
            _ => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Skipping subtitle language {}: not a track list", language);
                None
            }
        })
        .collect();

    Ok(tracks)
}

/// Keeps the descriptors that carry an extension and a URL, e.g. not inline 'data' tracks.
fn read_descriptors(descriptors: Vec<serde_json::Value>) -> Vec<SubtitleTrack> {
    descriptors
        .into_iter()
        .filter_map(|descriptor| match serde_json::from_value(descriptor) {
            Ok(track) => Some(track),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Skipping subtitle descriptor: {}", _e);
                None
            }
        })
        .collect()
}

/// Reads the subtitle literal and keeps the tracks with the given extension.
///
/// An unreadable literal yields no subtitles.
pub fn parse_subtitles(blob: &str, extension: &str) -> Vec<SubtitleEntry> {
    match parse_tracks(blob) {
        Ok(tracks) => select_tracks(tracks, extension),
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Ignoring unreadable subtitle list: {}", _e);

            Vec::new()
        }
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({}): {}", self.language, name, self.url),
            None => write!(f, "{}: {}", self.language, self.url),
        }
    }
}
