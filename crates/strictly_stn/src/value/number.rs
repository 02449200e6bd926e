//! Numbers, reals and double grades.
//!
//! Formatting never consults a process locale: `.` is always the decimal
//! point and digits are produced by the standard float formatter.

use crate::error::{StnError, StnErrorKind};
use tracing::instrument;

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

/// Parses a number: optional sign, one or more digits, nothing else.
#[instrument]
pub fn parse_number(text: &str) -> Result<i64, StnError> {
    if !is_digits(strip_sign(text)) {
        return Err(StnError::new(
            StnErrorKind::InvalidNumber,
            format!("Invalid number '{}'", text),
        ));
    }
    let digits = text.strip_prefix('+').unwrap_or(text);
    digits.parse::<i64>().map_err(|e| {
        StnError::new(
            StnErrorKind::InvalidNumber,
            format!("Number '{}' out of range: {}", text, e),
        )
    })
}

/// Parses a real: optional sign, digits, optional `.digits`; no exponent.
#[instrument]
pub fn parse_real(text: &str) -> Result<f64, StnError> {
    let unsigned = strip_sign(text);
    let valid = match unsigned.split_once('.') {
        Some((int, frac)) => is_digits(int) && is_digits(frac),
        None => is_digits(unsigned),
    };
    if !valid {
        return Err(StnError::new(
            StnErrorKind::InvalidNumber,
            format!("Invalid real '{}'", text),
        ));
    }
    text.parse::<f64>().map_err(|e| {
        StnError::new(
            StnErrorKind::InvalidNumber,
            format!("Invalid real '{}': {}", text, e),
        )
    })
}

/// Formats a real without exponent and without trailing fractional zeros.
///
/// Infinities clamp to the largest finite value of the same sign; NaN fails.
#[instrument]
pub fn format_real(value: f64) -> Result<String, StnError> {
    if value.is_nan() {
        return Err(StnError::new(
            StnErrorKind::NotANumber,
            "NaN cannot be serialized",
        ));
    }
    let value = if value.is_infinite() {
        f64::MAX.copysign(value)
    } else {
        value
    };

    // Display for f64 is the shortest representation that parses back to the
    // same value and never uses an exponent.
    let mut text = format!("{}", value);
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    Ok(text)
}

/// Emphasis of an annotation: "good" or "very good".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoubleGrade {
    /// Normal emphasis (`1`).
    Normal,
    /// Strong emphasis (`2`).
    Emphasized,
}

impl DoubleGrade {
    /// Creates a grade from its numeric form.
    #[instrument]
    pub fn from_number(value: i64) -> Result<Self, StnError> {
        match value {
            1 => Ok(Self::Normal),
            2 => Ok(Self::Emphasized),
            other => Err(StnError::new(
                StnErrorKind::DoubleOutOfRange,
                format!("Double must be 1 or 2, got {}", other),
            )),
        }
    }

    /// Parses the textual form.
    #[instrument]
    pub fn parse(text: &str) -> Result<Self, StnError> {
        Self::from_number(parse_number(text)?)
    }

    /// Returns the numeric form.
    pub fn as_number(self) -> i64 {
        match self {
            Self::Normal => 1,
            Self::Emphasized => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_follow_strict_grammar() {
        assert_eq!(parse_number("42").unwrap(), 42);
        assert_eq!(parse_number("+7").unwrap(), 7);
        assert_eq!(parse_number("-13").unwrap(), -13);
        for bad in ["", "-", "4 2", "12a", "four", "1.0"] {
            assert_eq!(parse_number(bad).unwrap_err().kind, StnErrorKind::InvalidNumber);
        }
    }

    #[test]
    fn reals_reject_exponents() {
        assert_eq!(parse_real("3.14").unwrap(), 3.14);
        assert_eq!(parse_real("-0.5").unwrap(), -0.5);
        assert_eq!(parse_real("12").unwrap(), 12.0);
        for bad in ["1e5", ".5", "5.", "1.2.3", "", "+"] {
            assert!(parse_real(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn real_formatting_strips_zeros() {
        assert_eq!(format_real(3.14).unwrap(), "3.14");
        assert_eq!(format_real(2.0).unwrap(), "2");
        assert_eq!(format_real(-7.5).unwrap(), "-7.5");
        assert_eq!(format_real(-0.0).unwrap(), "0");
    }

    #[test]
    fn real_formatting_clamps_infinity() {
        let text = format_real(f64::INFINITY).unwrap();
        assert_eq!(parse_real(&text).unwrap(), f64::MAX);
        let text = format_real(f64::NEG_INFINITY).unwrap();
        assert_eq!(parse_real(&text).unwrap(), -f64::MAX);
    }

    #[test]
    fn nan_is_not_serializable() {
        assert_eq!(format_real(f64::NAN).unwrap_err().kind, StnErrorKind::NotANumber);
    }

    #[test]
    fn real_round_trips() {
        for v in [0.1, 1.0 / 3.0, 123456.789, 1e-10, 5e15, -2.5e-3] {
            assert_eq!(parse_real(&format_real(v).unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn double_grade_range() {
        assert_eq!(DoubleGrade::parse("1").unwrap(), DoubleGrade::Normal);
        assert_eq!(DoubleGrade::parse("2").unwrap(), DoubleGrade::Emphasized);
        assert_eq!(DoubleGrade::parse("3").unwrap_err().kind, StnErrorKind::DoubleOutOfRange);
    }
}
