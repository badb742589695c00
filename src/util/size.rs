//! Byte-count formatting for listings, logs and manifest totals.

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * 1024 * 1024;

pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Megabytes rounded to two decimal places.
pub fn to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / MB as f64)
}

/// Gigabytes rounded to two decimal places.
pub fn to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / GB as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
