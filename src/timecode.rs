/// Timestamp parsing and formatting shared across the pipeline
///
/// Chapter tables, translation block markers and SRT caption files all
/// carry timestamps in "MM:SS" / "H:MM:SS" style with optional fractional
/// seconds. Parsing is permissive about zero-padding; formatting is
/// canonical so rendered values survive a parse/format round trip.
use tracing::warn;

/// Upper bound stand-in for an open-ended range ("End" in documents).
/// Larger than any real video duration so it sorts last.
pub const END_SENTINEL: f64 = 999_999.0;

/// Parse a timestamp string ("MM:SS", "H:MM:SS", optional `.`/`,` fraction) to seconds.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Split off a fractional-seconds suffix (caption files use both '.' and ',').
    let (base, fraction) = match trimmed.rfind(['.', ',']) {
        Some(pos) => {
            let digits = &trimmed[pos + 1..];
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                let frac: f64 = format!("0.{}", digits).parse().ok()?;
                (&trimmed[..pos], frac)
            } else {
                return None;
            }
        }
        None => (trimmed, 0.0),
    };

    // Checked arithmetic: digit groups are unbounded, so oversized values
    // fail the parse instead of overflowing.
    let parts: Vec<&str> = base.split(':').collect();
    let seconds = match parts.len() {
        2 => {
            let minutes: u64 = parts[0].parse().ok()?;
            let secs: u64 = parts[1].parse().ok()?;
            minutes.checked_mul(60)?.checked_add(secs)? as f64
        }
        3 => {
            let hours: u64 = parts[0].parse().ok()?;
            let minutes: u64 = parts[1].parse().ok()?;
            let secs: u64 = parts[2].parse().ok()?;
            hours
                .checked_mul(3600)?
                .checked_add(minutes.checked_mul(60)?)?
                .checked_add(secs)? as f64
        }
        _ => {
            warn!("Invalid timestamp format: {}", trimmed);
            return None;
        }
    };

    Some(seconds + fraction)
}

/// Format seconds as "H:MM:SS" (hour unpadded) when >= 1 hour, else "MM:SS".
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format an optional boundary, rendering an open end as the literal "End".
pub fn format_optional(seconds: Option<f64>) -> String {
    match seconds {
        Some(value) => format_timestamp(value),
        None => "End".to_string(),
    }
}

/// Human-readable range label ("MM:SS - MM:SS" or "MM:SS - End").
pub fn format_time_range(start_sec: f64, end_sec: Option<f64>) -> String {
    format!(
        "{} - {}",
        format_timestamp(start_sec),
        format_optional(end_sec)
    )
}
