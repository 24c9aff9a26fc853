//! Parsing of yt-dlp `[download]` progress lines.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[download\]\s+(\d+(?:\.\d+)?)%\s+of\s+~?\s*(\S+)(?:\s+in\s+(\S+))?(?:\s+at\s+(\S+))?(?:\s+ETA\s+(\S+))?",
    )
    .unwrap()
});

/// A single progress report of the tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// The completed percentage, between 0 and 100.
    pub percentage: f32,
    /// The total size as printed, e.g. '10.00MiB'.
    pub total_size: String,
    /// The current speed, e.g. '1.00MiB/s'.
    pub speed: Option<String>,
    /// The estimated remaining time, e.g. '00:05'.
    pub eta: Option<String>,
    /// The elapsed time, only printed once the transfer is complete.
    pub total_time: Option<String>,
}

impl Progress {
    /// Parses a progress line, returns `None` for any other line.
    ///
    /// # Arguments
    ///
    /// * `line` - A line of the tool output.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = PROGRESS_RE.captures(line)?;
        let percentage = captures.get(1)?.as_str().parse().ok()?;
        let text = |index: usize| {
            captures
                .get(index)
                .map(|m| m.as_str().to_string())
                .filter(|s| s != "Unknown")
        };

        Some(Self {
            percentage,
            total_size: text(2)?,
            total_time: text(3),
            speed: text(4),
            eta: text(5),
        })
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}% of {}", self.percentage, self.total_size)?;
        if let Some(speed) = &self.speed {
            write!(f, " at {}", speed)?;
        }
        if let Some(eta) = &self.eta {
            write!(f, " ETA {}", eta)?;
        }
        Ok(())
    }
}
