//! Human-readable byte and transfer-rate formatting.

// Display-only conversions; precision loss above 2^53 bytes is irrelevant
#![allow(clippy::cast_precision_loss)]

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count using base-1024 units with two decimals (`"1.50 MB"`).
///
/// Zero is rendered as `"0 B"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let (value, unit) = scale(bytes as f64);
    format!("{value:.2} {unit}")
}

/// Format a transfer rate in bytes per second (`"2.00 MB/s"`).
///
/// Zero, negative and non-finite rates are rendered as `"0 B/s"`.
pub fn format_speed(bytes_per_sec: f64) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return "0 B/s".to_string();
    }
    let (value, unit) = scale(bytes_per_sec);
    format!("{value:.2} {unit}/s")
}

fn scale(mut value: f64) -> (f64, &'static str) {
    let mut idx = 0;
    while value >= 1024.0 && idx < UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    (value, UNITS[idx])
}
