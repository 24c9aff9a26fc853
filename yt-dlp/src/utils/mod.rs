//! Utility functions and types used by the fetcher.

pub mod file_system;
pub mod literal;
pub mod progress;
pub mod timestamp;

/// Converts a vector of string slices to a vector of owned strings.
pub fn to_owned(args: Vec<&str>) -> Vec<String> {
    args.into_iter().map(|arg| arg.to_string()).collect()
}

/// Returns the executable name for the current platform.
///
/// # Arguments
///
/// * `name` - The name of the executable, without extension.
pub fn find_executable(name: impl AsRef<str>) -> String {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "windows")] {
            format!("{}.exe", name.as_ref())
        } else {
            name.as_ref().to_string()
        }
    }
}

/// Splits tool output into its non-empty lines.
pub fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
