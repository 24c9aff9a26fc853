//! Tools for working with the file system.

use crate::error::{Error, Result};
use std::path::Path;

/// Returns the given path as UTF-8, for use as a command-line argument.
pub fn try_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = path
        .to_str()
        .ok_or_else(|| Error::Path(format!("{} is not valid UTF-8", path.display())))?;

    Ok(text.to_string())
}

/// Creates a new directory at the given destination.
/// If the directory already exists, nothing is done.
///
/// # Arguments
///
/// * `destination` - The path to create the directory at.
pub fn create_dir(destination: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(destination)?;
    Ok(())
}

/// Creates the parent directory of the given destination.
/// If the parent directory already exists, nothing is done.
///
/// # Arguments
///
/// * `destination` - The path to create the parent directory for.
pub fn create_parent_dir(destination: impl AsRef<Path>) -> Result<()> {
    if let Some(parent) = destination.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    } else {
        std::fs::create_dir_all(destination.as_ref())?;
    }

    Ok(())
}
