//! Utility functions for the matchmaking engine

use chrono::{DateTime, Timelike, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Minute-of-hour for a timestamp, used as the room open minute when the
/// scheduler partitions an automated event
pub fn minute_of(ts: DateTime<Utc>) -> u32 {
    ts.minute()
}

/// Join display names for human-readable squad listings
pub fn join_names<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_minute_of() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 18, 55, 30).unwrap();
        assert_eq!(minute_of(ts), 55);
    }

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(&["a", "b", "c"]), "a, b, c");
        assert_eq!(join_names::<&str>(&[]), "");
    }
}
