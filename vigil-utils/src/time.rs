use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Timelike, Utc};

/// Return the current unix timestamp in seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Return the UTC hour of day (0-23) for a unix-seconds timestamp.
///
/// Timestamps outside the chrono-representable range fall back to hour 0.
pub fn hour_of_day_utc(unix_secs: u64) -> u32 {
    i64::try_from(unix_secs)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map_or(0, |datetime| datetime.hour())
}

#[cfg(test)]
mod tests {
    use super::hour_of_day_utc;

    #[test]
    fn hour_of_day_from_unix_seconds() {
        // 1970-01-01 00:00:00 and a few offsets.
        assert_eq!(hour_of_day_utc(0), 0);
        assert_eq!(hour_of_day_utc(3_600), 1);
        assert_eq!(hour_of_day_utc(23 * 3_600 + 59 * 60), 23);
        // 2024-01-01 13:30:00 UTC
        assert_eq!(hour_of_day_utc(1_704_115_800), 13);
    }
}
