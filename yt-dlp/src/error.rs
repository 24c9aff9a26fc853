//! The errors that can occur.

use std::time::Duration;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur.
#[derive(Debug, Error)]
pub enum Error {
    /// An error occurred while running the runtime.
    #[error("An error occurred while running the runtime: {0}")]
    Runtime(#[from] tokio::task::JoinError),
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// An error occurred while parsing JSON.
    #[error("An error occurred while parsing JSON: {0}")]
    Serde(#[from] serde_json::Error),
    /// An error occurred while interacting with the SQLite database.
    #[error("An error occurred while interacting with the database: {0}")]
    #[cfg(feature = "cache")]
    Database(#[from] rusqlite::Error),

    /// The tool wrote to its error stream.
    #[error("yt-dlp reported an error: {0}")]
    ToolRuntime(String),
    /// The tool output did not match the requested field layout.
    #[error("Expected {expected} output lines, received {received}")]
    MalformedOutput {
        /// The number of lines the schema asks for.
        expected: usize,
        /// The number of non-empty lines the tool printed.
        received: usize,
    },
    /// A structured print could not be turned into JSON.
    #[error("Invalid literal in tool output: {0}")]
    Literal(String),
    /// An error occurred while running a command.
    #[error("Failed to execute command: {0}")]
    Command(String),
    /// An error occurred due to a timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    /// The cache store could not be used.
    #[error("Cache error: {0}")]
    Cache(String),
    /// An error occurred manipulating a path.
    #[error("An invalid path was provided: {0}")]
    Path(String),
}
