//! Object size parsing and labels. Units are powers of 1024, so `1KB == 1KiB`.

use crate::error::{Error, Result};

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;

/// Parses `1KB`, `64KiB`, `1.5MB`, `512` (bytes) and similar.
pub fn parse_size(input: &str) -> Result<u64> {
    let s = input.trim();
    let err = || Error::InvalidSize(input.to_string());
    if s.is_empty() {
        return Err(err());
    }

    let split = s
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.'))
        .map_or(s.len(), |(idx, _)| idx);
    let (number, unit) = s.split_at(split);
    if number.is_empty() {
        return Err(err());
    }

    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KB,
        "M" | "MB" | "MIB" => MB,
        "G" | "GB" | "GIB" => GB,
        _ => return Err(err()),
    };

    if let Ok(whole) = number.parse::<u64>() {
        return whole.checked_mul(multiplier).ok_or_else(err);
    }

    let value: f64 = number.parse().map_err(|_| err())?;
    if !value.is_finite() || value < 0.0 {
        return Err(err());
    }
    Ok((value * multiplier as f64).round() as u64)
}

/// Short label used in scenario names: `1KB`, `64KB`, `1MB`, `100B`.
pub fn size_label(bytes: u64) -> String {
    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes}B")
    }
}

/// Parses a comma-separated size list.
pub fn parse_size_list(input: &str) -> Result<Vec<u64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        assert_eq!(parse_size("512").ok(), Some(512));
        assert_eq!(parse_size("1KB").ok(), Some(1024));
        assert_eq!(parse_size("64KiB").ok(), Some(64 * 1024));
        assert_eq!(parse_size("1mb").ok(), Some(MB));
        assert_eq!(parse_size("1.5MB").ok(), Some(MB + MB / 2));
        assert_eq!(parse_size(" 10 MB ").ok(), Some(10 * MB));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("MB").is_err());
        assert!(parse_size("10XB").is_err());
        assert!(parse_size("-1KB").is_err());
    }

    #[test]
    fn labels_round_sizes() {
        assert_eq!(size_label(100), "100B");
        assert_eq!(size_label(1024), "1KB");
        assert_eq!(size_label(16 * KB), "16KB");
        assert_eq!(size_label(MB), "1MB");
        assert_eq!(size_label(15 * MB), "15MB");
        assert_eq!(size_label(1500), "1500B");
    }

    #[test]
    fn parses_lists() {
        assert_eq!(parse_size_list("1KB, 1MB,").ok(), Some(vec![KB, MB]));
        assert!(parse_size_list("1KB,nope").is_err());
    }
}
