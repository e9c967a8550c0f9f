//! Duration formatting for notification messages

use std::time::Duration;

/// Format a duration the way it appears in notification messages:
/// `"30s"`, `"45m"`, `"1h 23m"`, `"2h"`.
///
/// Sub-minute durations show seconds; anything longer drops the seconds
/// entirely, since travel-time estimates are not second-accurate.
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    if total_secs < 60 {
        return format!("{}s", total_secs);
    }

    let minutes = total_secs / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    let remaining_minutes = minutes % 60;

    if remaining_minutes == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {}m", hours, remaining_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59s");
    }

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m");
        assert_eq!(format_duration(Duration::from_secs(45 * 60)), "45m");
    }

    #[test]
    fn test_format_duration_hours() {
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(3600 + 23 * 60)), "1h 23m");
        assert_eq!(format_duration(Duration::from_secs(2 * 3600)), "2h");
    }
}
