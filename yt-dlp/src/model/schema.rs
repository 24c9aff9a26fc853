//! The layout of the line-oriented tool output.
//!
//! The tool prints one line per requested field, in an order fixed by the tool and not
//! by the output itself. Every positional assumption about that output lives here.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// A field the tool can print on its own line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// The title of the media.
    Title,
    /// The site-specific ID of the media.
    Id,
    /// The direct URL of the selected format, or of its video stream.
    Url,
    /// The direct URL of the audio stream, when video and audio are split.
    AudioUrl,
    /// The description of the selected format, e.g. '22 - 1280x720 (720p)'.
    Format,
    /// The duration as `[[HH:]MM:]SS`.
    Duration,
    /// The subtitle tracks, as a Python literal.
    Subtitles,
}

impl Field {
    /// The arguments that make the tool print this field.
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Field::Title => &["--get-title"],
            Field::Id => &["--get-id"],
            Field::Url | Field::AudioUrl => &["-g"],
            Field::Format => &["--get-format"],
            Field::Duration => &["--get-duration"],
            Field::Subtitles => &["--print", "%(subtitles)s"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Id => "id",
            Field::Url => "url",
            Field::AudioUrl => "audio_url",
            Field::Format => "format",
            Field::Duration => "duration",
            Field::Subtitles => "subtitles",
        };
        write!(f, "{}", name)
    }
}

/// An ordered list of fields, one output line each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSchema {
    fields: Vec<Field>,
}

impl OutputSchema {
    /// Creates a schema from the fields in the order the tool prints them.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Title, ID, direct URL and format of a single muxed format.
    pub fn media_record() -> Self {
        Self::new(vec![Field::Title, Field::Id, Field::Url, Field::Format])
    }

    /// Title, ID and direct URL.
    pub fn basic() -> Self {
        Self::new(vec![Field::Title, Field::Id, Field::Url])
    }

    /// Title, ID, video URL, audio URL and format of separate streams.
    pub fn split_streams() -> Self {
        Self::new(vec![
            Field::Title,
            Field::Id,
            Field::Url,
            Field::AudioUrl,
            Field::Format,
        ])
    }

    /// The subtitle literal followed by the direct URL.
    pub fn subtitles() -> Self {
        Self::new(vec![Field::Subtitles, Field::Url])
    }

    /// The fields, in output order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The number of lines a complete output has.
    pub fn expected_lines(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema contains the given field.
    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// The format selection matching the number of URL lines in the schema.
    pub fn format_selector(&self) -> &'static str {
        if self.contains(Field::AudioUrl) {
            "bestvideo+bestaudio"
        } else {
            "best"
        }
    }

    /// The arguments requesting every field, each flag once.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        for field in &self.fields {
            let flags = field.args();
            let already = args
                .windows(flags.len())
                .any(|window| window.iter().zip(flags).all(|(a, b)| a.as_str() == *b));

            if !already {
                args.extend(flags.iter().map(|flag| flag.to_string()));
            }
        }
        args
    }

    /// Maps output lines onto the schema fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedOutput` if the line count differs from the field count.
    pub fn map(&self, lines: &[String]) -> Result<FieldMap> {
        if lines.len() != self.fields.len() {
            return Err(Error::MalformedOutput {
                expected: self.fields.len(),
                received: lines.len(),
            });
        }

        let values = self
            .fields
            .iter()
            .copied()
            .zip(lines.iter().cloned())
            .collect();

        Ok(FieldMap { values })
    }
}

/// The output lines of one call, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    values: HashMap<Field, String>,
}

impl FieldMap {
    /// Returns the value of a field, if the schema had it.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Takes the value of a field out of the map.
    pub fn take(&mut self, field: Field) -> Option<String> {
        self.values.remove(&field)
    }
}
