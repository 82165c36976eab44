//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // Check for suffix
    if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        return Ok(hours * 3600);
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        return Ok(minutes * 60);
    }
    if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?;
        return Ok(secs);
    }

    // No suffix - treat as seconds
    s.parse::<u64>()
        .with_context(|| format!("Invalid duration value: {s}"))
}

/// clap value parser for duration flags.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    parse_duration_to_secs(s).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_to_secs() {
        assert_eq!(parse_duration_to_secs("300").unwrap(), 300);
        assert_eq!(parse_duration_to_secs("30s").unwrap(), 30);
        assert_eq!(parse_duration_to_secs("2m").unwrap(), 120);
        assert_eq!(parse_duration_to_secs("1h").unwrap(), 3600);
        assert_eq!(parse_duration_to_secs(" 5s ").unwrap(), 5);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration_to_secs("").is_err());
        assert!(parse_duration_to_secs("xs").is_err());
        assert!(parse_duration_to_secs("-1").is_err());
        assert!(parse_duration_to_secs("1d").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    }
}
