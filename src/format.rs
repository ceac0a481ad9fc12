//! Human-readable sizes and durations for logs and summaries.

use std::time::Duration;

/// Formats a byte count using binary units, e.g. "3.25 MB".
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];

    UNITS
        .iter()
        .find(|(size, _)| bytes >= *size)
        .map_or_else(
            || format!("{bytes} B"),
            |(size, unit)| format!("{:.2} {unit}", bytes as f64 / *size as f64),
        )
}

/// Formats a duration as "5.0s", "1m 05s" or "1h 01m 05s".
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        3600.. => format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60),
        60.. => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{secs}.{}s", d.subsec_millis() / 100),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 + 256 * 1024), "3.25 MB");
        assert_eq!(format_bytes(1 << 30), "1.00 GB");
    }

    #[test]
    fn duration_units() {
        assert_eq!(format_duration(Duration::ZERO), "0.0s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 05s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 01m 05s");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn minutes_and_seconds_are_two_digits(secs in 60u64..360_000) {
                let text = format_duration(Duration::from_secs(secs));
                let last = text.split(' ').next_back().unwrap_or_default();
                prop_assert_eq!(last.len(), 3);
                prop_assert!(last.ends_with('s'));
            }

            #[test]
            fn bytes_always_have_a_unit(bytes in any::<u64>()) {
                let text = format_bytes(bytes);
                prop_assert!(["B", "KB", "MB", "GB"].iter().any(|u| text.ends_with(u)));
            }
        }
    }
}
