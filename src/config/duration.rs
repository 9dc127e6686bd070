//! Retry-window duration parsing.
//!
//! Accepted forms:
//! - bare integer, in seconds: `86400`
//! - integer with a unit suffix, case-insensitive: `500ms`, `30s`, `10m`,
//!   `24h`, `2d`
//! - ISO-8601 day/time durations: `PT24H`, `P1DT12H`, `PT1.5S`

use crate::error::ConfigError;
use std::time::Duration;

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u64 = 24 * MILLIS_PER_HOUR;

/// Parse a retry window. Zero is rejected: a lineage must get at least one
/// chance to retry.
pub fn parse_retry_window(text: &str) -> Result<Duration, ConfigError> {
    let trimmed = text.trim();
    let is_iso = trimmed
        .get(..1)
        .is_some_and(|first| first.eq_ignore_ascii_case("p"));
    let parsed = if is_iso {
        parse_iso8601(trimmed)
    } else {
        parse_simple(trimmed)
    };
    let duration = parsed.ok_or_else(|| invalid(text))?;

    if duration.is_zero() {
        return Err(ConfigError::Invalid(format!(
            "retry duration `{text}` must be greater than zero"
        )));
    }
    Ok(duration)
}

fn invalid(text: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "invalid retry duration `{text}`: expected seconds, <n><ms|s|m|h|d>, or ISO-8601 like PT24H"
    ))
}

fn parse_simple(text: &str) -> Option<Duration> {
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let amount: u64 = digits.parse().ok()?;
    let unit_millis = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "s" => MILLIS_PER_SECOND,
        "ms" => 1,
        "m" => MILLIS_PER_MINUTE,
        "h" => MILLIS_PER_HOUR,
        "d" => MILLIS_PER_DAY,
        _ => return None,
    };
    amount.checked_mul(unit_millis).map(Duration::from_millis)
}

fn parse_iso8601(text: &str) -> Option<Duration> {
    let upper = text.to_ascii_uppercase();
    let body = upper.strip_prefix('P')?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };
    if date_part.is_empty() && time_part.map_or(true, str::is_empty) {
        return None;
    }

    let mut total_millis: u64 = 0;
    if !date_part.is_empty() {
        let days = date_part.strip_suffix('D')?;
        let days: u64 = days.parse().ok()?;
        total_millis = total_millis.checked_add(days.checked_mul(MILLIS_PER_DAY)?)?;
    }

    if let Some(time) = time_part {
        let mut rest = time;
        let mut last_rank = 0u8;
        while !rest.is_empty() {
            let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
            let (number, tail) = rest.split_at(end);
            let designator = tail.chars().next()?;
            let (rank, unit_millis) = match designator {
                'H' => (1, MILLIS_PER_HOUR),
                'M' => (2, MILLIS_PER_MINUTE),
                'S' => (3, MILLIS_PER_SECOND),
                _ => return None,
            };
            if rank <= last_rank || number.is_empty() {
                return None;
            }
            last_rank = rank;
            let millis = component_millis(number, unit_millis, rank == 3)?;
            total_millis = total_millis.checked_add(millis)?;
            rest = &tail[1..];
        }
    }
    Some(Duration::from_millis(total_millis))
}

/// Whole units, or a decimal fraction for the seconds component only.
fn component_millis(number: &str, unit_millis: u64, allow_fraction: bool) -> Option<u64> {
    match number.split_once('.') {
        None => number.parse::<u64>().ok()?.checked_mul(unit_millis),
        Some((whole, fraction)) if allow_fraction && !fraction.is_empty() => {
            let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
            let digits: String = fraction.chars().chain("000".chars()).take(3).collect();
            let fraction_millis: u64 = digits.parse().ok()?;
            whole.checked_mul(unit_millis)?.checked_add(fraction_millis)
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Duration {
        parse_retry_window(text).unwrap_or_else(|e| panic!("`{text}` should parse: {e}"))
    }

    #[test]
    fn bare_integer_is_seconds() {
        assert_eq!(parsed("86400"), Duration::from_secs(86_400));
        assert_eq!(parsed(" 5 "), Duration::from_secs(5));
    }

    #[test]
    fn unit_suffixes_are_case_insensitive() {
        assert_eq!(parsed("24H"), Duration::from_secs(24 * 3600));
        assert_eq!(parsed("24h"), Duration::from_secs(24 * 3600));
        assert_eq!(parsed("500ms"), Duration::from_millis(500));
        assert_eq!(parsed("10m"), Duration::from_secs(600));
        assert_eq!(parsed("30s"), Duration::from_secs(30));
        assert_eq!(parsed("2d"), Duration::from_secs(2 * 86_400));
    }

    #[test]
    fn iso8601_forms() {
        assert_eq!(parsed("PT24H"), Duration::from_secs(24 * 3600));
        assert_eq!(parsed("pt15m"), Duration::from_secs(900));
        assert_eq!(parsed("P1DT12H"), Duration::from_secs(36 * 3600));
        assert_eq!(parsed("P2D"), Duration::from_secs(2 * 86_400));
        assert_eq!(parsed("PT1H30M5S"), Duration::from_secs(5405));
        assert_eq!(parsed("PT1.5S"), Duration::from_millis(1500));
    }

    #[test]
    fn rejects_malformed_values() {
        for text in [
            "", "h", "-5", "5 weeks", "1.5h", "P", "PT", "PT5", "PT1M1H", "PT1.5H", "P1H",
        ] {
            assert!(
                matches!(parse_retry_window(text), Err(ConfigError::Invalid(_))),
                "`{text}` should be rejected"
            );
        }
    }

    #[test]
    fn rejects_zero() {
        let err = parse_retry_window("0s").unwrap_err();
        assert!(err.to_string().contains("greater than zero"), "got: {err}");
        assert!(parse_retry_window("PT0S").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_retry_window("99999999999999999999d").is_err());
        assert!(parse_retry_window("P9999999999999999D").is_err());
    }
}
