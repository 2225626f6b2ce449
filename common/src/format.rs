//! Display helpers for video metadata: human-readable sizes, dates, and
//! file names recovered from HTTP response headers.
//!
//! Everything here is total: malformed input yields `None` (or a fallback
//! label) rather than an error.

use chrono::{DateTime, FixedOffset, Local, TimeZone};

/// Name used when the latest video carries no usable `content-disposition`.
pub const DEFAULT_VIDEO_NAME: &str = "video-recording.mp4";
/// Label shown when `last-modified` is absent or unparseable.
pub const DATE_UNAVAILABLE: &str = "date unavailable";
/// Label shown when `content-length` is absent or unparseable.
pub const SIZE_UNAVAILABLE: &str = "size unavailable";

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with two decimals in the largest 1024-based unit
/// not exceeding it.
///
/// The unit index is `floor(ln(bytes) / ln(1024))`, clamped to `GB`.
/// Zero is special-cased because `ln(0)` is undefined.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let k = 1024f64;
    let b = bytes as f64;
    let i = ((b.ln() / k.ln()).floor() as usize).min(SIZE_UNITS.len() - 1);
    format!("{:.2} {}", b / k.powi(i as i32), SIZE_UNITS[i])
}

/// Extract the `filename` parameter from a `content-disposition` value.
///
/// Takes the text after `filename...=` up to the next `;` or newline, or a
/// whole quoted string when the value opens with a quote.  All quote
/// characters are then removed.  Returns `None` when nothing usable remains.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut from = 0;
    while let Some(pos) = value[from..].find("filename") {
        let start = from + pos + "filename".len();
        from = from + pos + 1;

        // `filename` may be followed by anything but `;`, `=` or a newline
        // before the `=` (this is how `filename*=` is accepted).
        let rest = &value[start..];
        let Some(eq) = rest.find([';', '=', '\n']) else {
            return None;
        };
        if !rest[eq..].starts_with('=') {
            continue;
        }

        let raw = quoted_or_bare(&rest[eq + 1..]);
        let name: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
        return if name.is_empty() { None } else { Some(name) };
    }
    None
}

fn quoted_or_bare(value: &str) -> &str {
    if let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let line = value.split('\n').next().unwrap_or_default();
        if let Some(close) = line[1..].find(quote) {
            return &line[..close + 2];
        }
    }
    let end = value.find([';', '\n']).unwrap_or(value.len());
    &value[..end]
}

/// Display name for the latest video, falling back to
/// [`DEFAULT_VIDEO_NAME`].
pub fn latest_video_name(content_disposition: Option<&str>) -> String {
    content_disposition
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| DEFAULT_VIDEO_NAME.to_string())
}

/// Parse an HTTP date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value.trim()).ok()
}

/// Render a timestamp as `6 November 1994, 08:49` in the given zone.
pub fn format_timestamp_in<Tz: TimeZone>(ts: &DateTime<FixedOffset>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.with_timezone(tz).format("%-d %B %Y, %H:%M").to_string()
}

/// Render a timestamp in the operator's local zone.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    format_timestamp_in(ts, &Local)
}
