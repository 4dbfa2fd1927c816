//! Unit scaling for the reported total
//!
//! The total is rendered in the largest decimal (1000-based) unit for
//! which the scaled value lies in `[1, 1000)`, with two decimal digits.
//! A zero total reports in the base unit. This rendering is part of the
//! CLI contract (`Total size: 4.45 KB`), so it is implemented here rather
//! than delegated to a display-oriented crate.

/// Decimal unit ladder
const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Scale factor between adjacent units
const SCALE: f64 = 1000.0;

/// Scale a byte count to the largest fitting decimal unit
pub fn scale_bytes(bytes: i64) -> (f64, &'static str) {
    let mut value = bytes as f64;
    let mut unit = UNITS[0];

    for next in UNITS[1..].iter().copied() {
        if value < SCALE {
            break;
        }
        value /= SCALE;
        unit = next;
    }

    (value, unit)
}

/// Render a byte count with two decimal digits, e.g. `"4.45 KB"`
pub fn format_bytes(bytes: i64) -> String {
    let (value, unit) = scale_bytes(bytes);
    format!("{:.2} {}", value, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_reports_base_unit() {
        assert_eq!(format_bytes(0), "0.00 B");
    }

    #[test]
    fn test_sub_kilobyte_stays_in_bytes() {
        assert_eq!(format_bytes(1), "1.00 B");
        assert_eq!(format_bytes(999), "999.00 B");
    }

    #[test]
    fn test_unit_boundaries() {
        assert_eq!(format_bytes(1000), "1.00 KB");
        assert_eq!(format_bytes(1_000_000), "1.00 MB");
        assert_eq!(format_bytes(1_000_000_000), "1.00 GB");
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        assert_eq!(format_bytes(4446), "4.45 KB");
        assert_eq!(format_bytes(3_500_000), "3.50 MB");
    }

    #[test]
    fn test_scale_stays_in_range() {
        for bytes in [1i64, 999, 1000, 999_999, 1_000_000, 123_456_789_012] {
            let (value, _) = scale_bytes(bytes);
            assert!(value >= 1.0, "{} scaled below 1", bytes);
            assert!(value < 1000.0, "{} scaled above 1000", bytes);
        }
    }
}
