//! Conversion between raw register integers and scaled engineering values
//!
//! A register holding `255` with one implied decimal reads as `25.5`. Writes go
//! the other way: the value is scaled, rounded half away from zero and checked
//! against the parameter's raw domain. Nothing is ever wrapped or clamped.

use errors::{KilnError, KilnResult};
use serde::{Deserialize, Serialize};

/// Inclusive range of raw integers a register accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDomain {
    pub min: i32,
    pub max: i32,
}

impl RawDomain {
    /// Full signed 16-bit range, two's complement on the wire
    pub const I16: Self = Self::new(i16::MIN as i32, i16::MAX as i32);
    /// Full unsigned 16-bit range
    pub const U16: Self = Self::new(0, u16::MAX as i32);

    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Negative raw values are allowed, so words decode as `i16`
    pub const fn is_signed(&self) -> bool {
        self.min < 0
    }

    pub fn contains(&self, raw: i32) -> bool {
        (self.min..=self.max).contains(&raw)
    }

    /// Interpret a wire word according to the domain's signedness
    pub fn decode(&self, word: u16) -> i32 {
        if self.is_signed() {
            i32::from(word as i16)
        } else {
            i32::from(word)
        }
    }

    /// Encode a raw integer as a wire word (two's complement for negatives)
    pub fn encode(&self, raw: i32) -> u16 {
        raw as u16
    }
}

fn factor(decimals: u8) -> f64 {
    10f64.powi(i32::from(decimals))
}

/// Scale a raw register integer: `raw / 10^decimals`
pub fn to_value(raw: i32, decimals: u8) -> f64 {
    f64::from(raw) / factor(decimals)
}

/// Scale an engineering value to a raw register integer
///
/// Fails with `OutOfRange` when the rounded result falls outside `domain` or
/// the value is not finite.
pub fn to_raw(parameter: &str, value: f64, decimals: u8, domain: RawDomain) -> KilnResult<i32> {
    let out_of_range =
        || KilnError::out_of_range(parameter, value, i64::from(domain.min), i64::from(domain.max));

    if !value.is_finite() {
        return Err(out_of_range());
    }

    // f64::round rounds half away from zero
    let scaled = (value * factor(decimals)).round();
    if scaled < f64::from(domain.min) || scaled > f64::from(domain.max) {
        return Err(out_of_range());
    }

    Ok(scaled as i32)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    const TEMP: RawDomain = RawDomain::new(-999, 9999);

    #[test]
    fn test_to_value_scaling() {
        assert_eq!(to_value(255, 1), 25.5);
        assert_eq!(to_value(-5, 1), -0.5);
        assert_eq!(to_value(150, 2), 1.5);
        assert_eq!(to_value(17, 0), 17.0);
    }

    #[test]
    fn test_to_raw_rounds_half_away_from_zero() {
        assert_eq!(to_raw("sv", 25.25, 1, TEMP).unwrap(), 253);
        assert_eq!(to_raw("sv", -2.25, 1, TEMP).unwrap(), -23);
        assert_eq!(to_raw("sv", 0.04, 1, TEMP).unwrap(), 0);
        assert_eq!(to_raw("coef", 1.234, 2, TEMP).unwrap(), 123);
    }

    #[test]
    fn test_to_raw_out_of_range_instead_of_wrapping() {
        let domain = RawDomain::new(-999, 999);
        let err = to_raw("temperature_regulation", 100.0, 1, domain).unwrap_err();
        assert!(matches!(err, KilnError::OutOfRange { min: -999, max: 999, .. }));

        // 999.5 rounds up to 1000, one past the top of the domain
        assert!(to_raw("temperature_regulation", 99.95, 1, domain).is_err());
        assert!(to_raw("temperature_regulation", 99.9, 1, domain).is_ok());
        assert!(to_raw("temperature_regulation", -100.0, 1, domain).is_err());
        assert!(to_raw("word", 70000.0, 0, RawDomain::U16).is_err());
    }

    #[test]
    fn test_to_raw_rejects_non_finite() {
        assert!(to_raw("sv", f64::NAN, 1, TEMP).is_err());
        assert!(to_raw("sv", f64::INFINITY, 1, TEMP).is_err());
    }

    #[test]
    fn test_round_trip_at_every_resolution() {
        for decimals in 0..=2u8 {
            for value in [-9.99, -1.0, 0.0, 0.01, 1.5, 12.34, 99.99] {
                let raw = to_raw("p", value, decimals, TEMP).unwrap();
                let back = to_value(raw, decimals);
                let f = 10f64.powi(i32::from(decimals));
                let expected = (value * f).round() / f;
                assert!((back - expected).abs() < 1e-9, "{value} @ {decimals}");
            }
        }
    }

    #[test]
    fn test_signed_words_use_twos_complement() {
        let raw = to_raw("sv", -5.0, 1, TEMP).unwrap();
        let word = TEMP.encode(raw);
        assert_eq!(word, 0xFFCE);
        assert_eq!(TEMP.decode(word), -50);

        assert_eq!(RawDomain::U16.decode(0xFFCE), 0xFFCE);
        assert_eq!(RawDomain::I16.decode(0x8000), -32768);
    }
}
