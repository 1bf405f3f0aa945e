//! Human-readable durations for the command line.

use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Suffix to nanoseconds multiplier; `ms` and `min` come before `s`.
const UNITS: &[(&str, f64)] = &[
    ("ms", 1e6),
    ("min", 60e9),
    ("h", 3600e9),
    ("s", 1e9),
];

/// Parse `"10s"`, `"250ms"`, `"2min"`, `"1h"` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty duration");
    }

    let (value, scale) = UNITS
        .iter()
        .find_map(|(suffix, scale)| s.strip_suffix(suffix).map(|v| (v, *scale)))
        .unwrap_or((s, 1e9));

    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid duration `{s}`"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("duration must be a non-negative number, got `{s}`");
    }
    Ok(Duration::from_nanos((value * scale).round() as u64))
}

/// Format a duration for log lines.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if d.is_zero() {
        "0s".to_string()
    } else if secs < 1.0 {
        format!("{:.0}ms", secs * 1e3)
    } else if secs < 120.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.1}min", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2min").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration(" 1.5 ").unwrap(), Duration::from_millis(1500));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn format_ranges() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(10)), "10.00s");
        assert_eq!(format_duration(Duration::from_secs(300)), "5.0min");
    }
}
