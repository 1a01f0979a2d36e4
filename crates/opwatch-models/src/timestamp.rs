//! Timestamp parsing for reference step offsets.
//!
//! Step offsets in procedure definitions use `MM:SS` or `HH:MM:SS`.

use thiserror::Error;

/// Timestamp parsing/validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp cannot be empty")]
    Empty,

    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("invalid timestamp format '{0}', expected MM:SS or HH:MM:SS")]
    InvalidFormat(String),

    #[error("start time must be before end time")]
    StartNotBeforeEnd,
}

/// Parse an `MM:SS` or `HH:MM:SS` offset into total seconds.
pub fn parse_timestamp(ts: &str) -> Result<u64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    match parts.len() {
        2 => {
            let minutes: u64 = parts[0]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("minutes", parts[0].to_string()))?;
            let seconds: u64 = parts[1]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("seconds", parts[1].to_string()))?;
            Ok(minutes * 60 + seconds)
        }
        3 => {
            let hours: u64 = parts[0]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("hours", parts[0].to_string()))?;
            let minutes: u64 = parts[1]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("minutes", parts[1].to_string()))?;
            let seconds: u64 = parts[2]
                .parse()
                .map_err(|_| TimestampError::InvalidValue("seconds", parts[2].to_string()))?;
            Ok(hours * 3600 + minutes * 60 + seconds)
        }
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Format total seconds as `HH:MM:SS`.
pub fn format_seconds(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

/// Validate a start/end offset pair, returning the span in seconds.
pub fn validate_range(start: &str, end: &str) -> Result<u64, TimestampError> {
    let start_secs = parse_timestamp(start)?;
    let end_secs = parse_timestamp(end)?;
    if start_secs >= end_secs {
        return Err(TimestampError::StartNotBeforeEnd);
    }
    Ok(end_secs - start_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mm_ss() {
        assert_eq!(parse_timestamp("05:30").unwrap(), 330);
        assert_eq!(parse_timestamp("00:00").unwrap(), 0);
        assert_eq!(parse_timestamp("53:53").unwrap(), 3233);
    }

    #[test]
    fn test_parse_hh_mm_ss() {
        assert_eq!(parse_timestamp("01:30:45").unwrap(), 5445);
        assert_eq!(parse_timestamp("00:01:00").unwrap(), 60);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_timestamp(""), Err(TimestampError::Empty));
        assert!(matches!(
            parse_timestamp("90"),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_timestamp("aa:bb"),
            Err(TimestampError::InvalidValue(_, _))
        ));
        assert!(matches!(
            parse_timestamp("1:2:3:4"),
            Err(TimestampError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0), "00:00:00");
        assert_eq!(format_seconds(90), "00:01:30");
        assert_eq!(format_seconds(3661), "01:01:01");
    }

    #[test]
    fn test_validate_range() {
        assert_eq!(validate_range("00:30", "01:30").unwrap(), 60);
        assert_eq!(
            validate_range("02:00", "01:00"),
            Err(TimestampError::StartNotBeforeEnd)
        );
    }
}
