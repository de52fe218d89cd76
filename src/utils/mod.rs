pub mod logging;

/// Formats a millisecond countdown as "m:ss" for alert text. Negative values
/// clamp to "0:00".
pub fn format_countdown(remaining_ms: i64) -> String {
    let remaining_ms = remaining_ms.max(0);
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1_000;
    format!("{}:{:02}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_zero_padded_seconds() {
        assert_eq!(format_countdown(120_000), "2:00");
        assert_eq!(format_countdown(119_000), "1:59");
        assert_eq!(format_countdown(61_000), "1:01");
        assert_eq!(format_countdown(9_500), "0:09");
        assert_eq!(format_countdown(0), "0:00");
    }

    #[test]
    fn negative_remaining_clamps_to_zero() {
        assert_eq!(format_countdown(-500), "0:00");
    }
}
