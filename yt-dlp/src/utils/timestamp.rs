//! Conversions between `[[HH:]MM:]SS` timestamps and seconds.

/// Converts a `[[HH:]MM:]SS` timestamp into seconds.
///
/// Segments are read right to left as seconds, minutes, hours, and so on.
/// Only the leading digits of a segment count, a segment without any is 0.
///
/// # Examples
///
/// ```rust
/// # use yt_dlp_media::utils::timestamp::timestamp_to_seconds;
/// assert_eq!(timestamp_to_seconds("01:02:03"), 3723);
/// assert_eq!(timestamp_to_seconds("2:00"), 120);
/// ```
pub fn timestamp_to_seconds(timestamp: impl AsRef<str>) -> u64 {
    timestamp
        .as_ref()
        .trim()
        .split(':')
        .rev()
        .fold((0u64, 1u64), |(seconds, multiplier), segment| {
            let value = leading_integer(segment);
            (
                seconds.saturating_add(value.saturating_mul(multiplier)),
                multiplier.saturating_mul(60),
            )
        })
        .0
}

/// Formats seconds as `HH:MM:SS.cc`.
///
/// Hours are not wrapped at a day. The fraction is rounded to hundredths.
///
/// # Examples
///
/// ```rust
/// # use yt_dlp_media::utils::timestamp::seconds_to_timestamp;
/// assert_eq!(seconds_to_timestamp(3723.456), "01:02:03.46");
/// ```
pub fn seconds_to_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let mut whole = seconds.trunc() as u64;
    let mut hundredths = ((seconds - seconds.trunc()) * 100.0).round() as u64;
    if hundredths >= 100 {
        whole += 1;
        hundredths -= 100;
    }

    format!(
        "{:02}:{:02}:{:02}.{:02}",
        whole / 3600,
        (whole % 3600) / 60,
        whole % 60,
        hundredths
    )
}

fn leading_integer(segment: &str) -> u64 {
    let digits: String = segment
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}
