use chrono::{DateTime, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const STANDARD_TIME_FORMAT: &'static str = "%Y-%m-%d %H:%M";
}

pub fn now_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for display purposes
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => format!("{}", dt.format(TimeUtils::STANDARD_TIME_FORMAT)),
        None => format!("{}ms", epoch_ms),
    }
}

pub fn format_duration(ms: i64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    format!("{}d", days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_picks_largest_unit() {
        assert_eq!(format_duration(999), "0s");
        assert_eq!(format_duration(90 * TimeUtils::MS_IN_S), "1m");
        assert_eq!(format_duration(TimeUtils::MS_IN_D - 1), "23h");
        assert_eq!(format_duration(3 * TimeUtils::MS_IN_D), "3d");
    }

    #[test]
    fn epoch_formatting() {
        assert_eq!(epoch_ms_to_utc(0), "1970-01-01 00:00");
    }
}
