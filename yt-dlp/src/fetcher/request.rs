//! The page a fetch is about, and the per-call options that come with it.

use crate::error::Result;
use crate::utils::file_system;
use std::fmt;
use std::path::PathBuf;

/// A request for the media behind a page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    /// The page URL, e.g. 'https://www.youtube.com/watch?v=...'.
    pub page_url: String,
    /// A Netscape cookie file, overriding the fetcher default.
    pub cookie_file: Option<PathBuf>,
    /// A locale, overriding the fetcher default.
    pub locale: Option<String>,
}

impl MediaRequest {
    /// Creates a request for the given page URL.
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            cookie_file: None,
            locale: None,
        }
    }

    /// Sets the cookie file for this request.
    pub fn with_cookie_file(mut self, cookie_file: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(cookie_file.into());
        self
    }

    /// Sets the locale for this request.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// The playlist position encoded in the page URL, if any.
    pub fn playlist_hint(&self) -> Option<PlaylistHint> {
        PlaylistHint::from_url(&self.page_url)
    }

    /// The cookie and playlist arguments of this request.
    ///
    /// # Arguments
    ///
    /// * `default_cookie_file` - The cookie file to use when the request has none.
    pub(crate) fn selection_args(&self, default_cookie_file: Option<&PathBuf>) -> Result<Vec<String>> {
        let mut args = Vec::new();

        if let Some(cookie_file) = self.cookie_file.as_ref().or(default_cookie_file) {
            args.push("--cookies".to_string());
            args.push(file_system::try_to_string(cookie_file)?);
        }

        if let Some(hint) = self.playlist_hint() {
            args.push("--playlist-items".to_string());
            args.push(hint.index.to_string());
        }

        Ok(args)
    }
}

impl From<&str> for MediaRequest {
    fn from(page_url: &str) -> Self {
        Self::new(page_url)
    }
}

impl From<String> for MediaRequest {
    fn from(page_url: String) -> Self {
        Self::new(page_url)
    }
}

impl From<&String> for MediaRequest {
    fn from(page_url: &String) -> Self {
        Self::new(page_url.as_str())
    }
}

impl fmt::Display for MediaRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.page_url)
    }
}

/// A position within a playlist, taken from the `list` and `index` query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHint {
    /// The playlist ID.
    pub list: String,
    /// The 1-based position within the playlist.
    pub index: u32,
}

impl PlaylistHint {
    /// Reads the hint from a page URL.
    ///
    /// There is a hint only when a `list` parameter is present. A missing or unusable
    /// `index` means the first entry. An unparsable URL carries no hint.
    pub fn from_url(page_url: &str) -> Option<Self> {
        let parsed = match url::Url::parse(page_url) {
            Ok(parsed) => parsed,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Ignoring playlist parameters of {}: {}", page_url, _e);
                return None;
            }
        };

        let mut list = None;
        let mut index = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "list" if list.is_none() => list = Some(value.into_owned()),
                "index" if index.is_none() => index = value.parse::<u32>().ok().filter(|i| *i > 0),
                _ => {}
            }
        }

        Some(Self {
            list: list?,
            index: index.unwrap_or(1),
        })
    }
}
