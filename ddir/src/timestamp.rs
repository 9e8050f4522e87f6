//! Modification timestamps with a precision-tolerant comparison rule
//!
//! Different filesystems report modification times with different sub-second
//! resolution (ext4 keeps nanoseconds, FAT variants round to whole or even
//! seconds, network mounts often truncate). Comparing the raw values across
//! such a boundary reports files as different when they are not. The rule
//! here truncates both operands to the lesser of the two apparent decimal
//! precisions before comparing; the raw values are never mutated.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Raw modification time of a filesystem entry.
///
/// Whole seconds since the Unix epoch plus the nanosecond remainder, exactly
/// as reported by the filesystem. Timestamps before the epoch collapse to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModTime {
    secs: u64,
    nanos: u32,
}

impl ModTime {
    pub fn new(secs: u64, nanos: u32) -> Self {
        Self {
            secs: secs + u64::from(nanos / NANOS_PER_SEC),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    pub fn secs(&self) -> u64 {
        self.secs
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Apparent decimal precision: the number of significant fractional
    /// digits, not counting trailing zeros. `0.123000000` has precision 3.
    pub fn precision(&self) -> u32 {
        if self.nanos == 0 {
            return 0;
        }

        let mut nanos = self.nanos;
        let mut digits = 9;
        while nanos % 10 == 0 {
            nanos /= 10;
            digits -= 1;
        }

        digits
    }

    /// Fractional part truncated (never rounded) to `digits` decimal places.
    fn truncated_nanos(&self, digits: u32) -> u32 {
        if digits >= 9 {
            return self.nanos;
        }

        let factor = 10u32.pow(9 - digits);
        self.nanos / factor * factor
    }

    /// Compares two timestamps after truncating both fractional parts to the
    /// lesser of the two apparent precisions.
    ///
    /// `12.123456` vs `12.12` compare equal; `12.123456` vs `12.13` compare
    /// as `12.12` vs `12.13`, i.e. `Less`.
    pub fn tolerant_cmp(&self, other: &ModTime) -> Ordering {
        let digits = self.precision().min(other.precision());

        (self.secs, self.truncated_nanos(digits)).cmp(&(other.secs, other.truncated_nanos(digits)))
    }
}

impl From<SystemTime> for ModTime {
    fn from(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self::new(since_epoch.as_secs(), since_epoch.subsec_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0; "whole seconds")]
    #[test_case(120_000_000, 2; "two digits")]
    #[test_case(123_456_000, 6; "six digits")]
    #[test_case(123_456_789, 9; "full nanoseconds")]
    #[test_case(1, 9; "single trailing nanosecond")]
    fn precision_is_inferred_from_significant_digits(nanos: u32, expected: u32) {
        assert_eq!(ModTime::new(12, nanos).precision(), expected);
    }

    #[test_case(12, 123_456_000, 12, 120_000_000, Ordering::Equal; "coarser side wins")]
    #[test_case(12, 123_456_000, 12, 130_000_000, Ordering::Less; "still ordered after truncation")]
    #[test_case(12, 130_000_000, 12, 123_456_000, Ordering::Greater; "ordering is symmetric")]
    #[test_case(13, 0, 12, 999_999_999, Ordering::Greater; "whole seconds dominate")]
    #[test_case(12, 0, 12, 900_000_000, Ordering::Equal; "whole second side masks the fraction")]
    fn tolerant_comparison(
        a_secs: u64,
        a_nanos: u32,
        b_secs: u64,
        b_nanos: u32,
        expected: Ordering,
    ) {
        let a = ModTime::new(a_secs, a_nanos);
        let b = ModTime::new(b_secs, b_nanos);
        assert_eq!(a.tolerant_cmp(&b), expected);
    }

    #[test]
    fn truncation_never_rounds() {
        // 12.129 truncated to 2 digits is 12.12, not 12.13
        let fine = ModTime::new(12, 129_000_000);
        let coarse = ModTime::new(12, 120_000_000);
        assert_eq!(fine.tolerant_cmp(&coarse), Ordering::Equal);
    }

    #[test]
    fn raw_values_are_preserved() {
        let time = ModTime::new(12, 123_456_789);
        let _ = time.tolerant_cmp(&ModTime::new(12, 120_000_000));
        assert_eq!(time.nanos(), 123_456_789);
    }

    #[test]
    fn nanosecond_overflow_carries_into_seconds() {
        let time = ModTime::new(1, 1_500_000_000);
        assert_eq!(time.secs(), 2);
        assert_eq!(time.nanos(), 500_000_000);
    }
}
