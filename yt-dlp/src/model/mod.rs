//! The models returned by the fetcher.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

pub mod caption;
pub mod schema;

static RESOLUTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)x(\d+)").unwrap());

/// The metadata and direct URL of a media page.
///
/// Which fields are filled depends on the schema that was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// The title of the media.
    pub title: String,
    /// The site-specific ID of the media.
    pub id: String,
    /// The direct URL of the media, or of its video stream.
    pub url: String,
    /// The direct URL of the audio stream, when video and audio are split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// The description of the selected format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// The width of the selected format in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// The height of the selected format in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// When the signed direct URL stops working.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MediaRecord {
    /// Sets the format and the resolution found in it.
    pub fn with_format(mut self, format: Option<String>) -> Self {
        let resolution = format.as_deref().and_then(parse_resolution);
        self.width = resolution.map(|(width, _)| width);
        self.height = resolution.map(|(_, height)| height);
        self.format = format;
        self
    }

    /// Sets the expiry from the signature of the direct URL.
    pub fn with_expiry_from_url(mut self) -> Self {
        self.expires_at = url_expiry(&self.url);
        self
    }

    /// Whether the direct URL is still valid at the given time.
    ///
    /// Records without a known expiry are never considered live.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at > now)
    }
}

impl fmt::Display for MediaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaRecord(id={}, title=\"{}\"", self.id, self.title)?;
        if let (Some(width), Some(height)) = (self.width, self.height) {
            write!(f, ", {}x{}", width, height)?;
        }
        write!(f, ")")
    }
}

/// Extracts the last `WIDTHxHEIGHT` token of a format description.
///
/// # Examples
///
/// ```rust
/// # use yt_dlp_media::model::parse_resolution;
/// assert_eq!(parse_resolution("22 - 1280x720 (720p)"), Some((1280, 720)));
/// assert_eq!(parse_resolution("251 - audio only (medium)"), None);
/// ```
pub fn parse_resolution(format: &str) -> Option<(u32, u32)> {
    let captures = RESOLUTION_RE.captures_iter(format).last()?;
    let width = captures.get(1)?.as_str().parse().ok()?;
    let height = captures.get(2)?.as_str().parse().ok()?;
    Some((width, height))
}

/// Decodes the `expire` unix timestamp a signed media URL carries.
///
/// Both the `?expire=` query parameter and the `/expire/<ts>/` path form are understood.
pub fn url_expiry(direct_url: &str) -> Option<DateTime<Utc>> {
    let parsed = url::Url::parse(direct_url).ok()?;

    let from_query = parsed
        .query_pairs()
        .find(|(key, _)| key == "expire")
        .map(|(_, value)| value.into_owned());

    let from_path = || {
        let mut segments = parsed.path_segments()?;
        segments.find(|segment| *segment == "expire")?;
        segments.next().map(str::to_string)
    };

    let timestamp: i64 = from_query.or_else(from_path)?.parse().ok()?;
    DateTime::from_timestamp(timestamp, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_takes_last_token() {
        assert_eq!(parse_resolution("137+140 - 1920x1080 (1080p)"), Some((1920, 1080)));
        assert_eq!(parse_resolution("hls-1 - 640x360 (low) - 1280x720"), Some((1280, 720)));
        assert_eq!(parse_resolution("unknown"), None);
    }

    #[test]
    fn format_sets_dimensions() {
        let record = MediaRecord::default().with_format(Some("18 - 640x360 (360p)".to_string()));

        assert_eq!(record.width, Some(640));
        assert_eq!(record.height, Some(360));
        assert_eq!(record.to_string(), "MediaRecord(id=, title=\"\", 640x360)");
    }

    #[test]
    fn expiry_from_query() {
        let expiry = url_expiry("https://rr1.example.com/videoplayback?expire=1700000000&ei=x").unwrap();
        assert_eq!(expiry.timestamp(), 1_700_000_000);
    }

    #[test]
    fn expiry_from_path() {
        let expiry = url_expiry("https://manifest.example.com/api/manifest/hls/expire/1700000000/ei/x").unwrap();
        assert_eq!(expiry.timestamp(), 1_700_000_000);
    }

    #[test]
    fn no_expiry() {
        assert_eq!(url_expiry("https://x/video"), None);
        assert_eq!(url_expiry("https://x/video?expire=soon"), None);
        assert_eq!(url_expiry("not a url"), None);
    }

    #[test]
    fn liveness() {
        let now = Utc::now();
        let mut record = MediaRecord::default();
        assert!(!record.is_live_at(now));

        record.expires_at = Some(now + chrono::Duration::seconds(60));
        assert!(record.is_live_at(now));
        assert!(!record.is_live_at(now + chrono::Duration::seconds(61)));
    }
}
