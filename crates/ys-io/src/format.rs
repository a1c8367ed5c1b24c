//! Number formatting shared by the writers and readers.
//!
//! Floating values are written with six significant digits in scientific
//! notation and a signed, at least two-digit exponent (`1.23450e-05`), so
//! the same object always produces the same text on every platform.

use ys_core::{Error, Result};

/// Format `v` as `d.ddddde±XX`.
pub fn fmt_f64(v: f64) -> String {
    let s = format!("{v:.5e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        // inf / NaN
        None => s,
    }
}

/// Parse a floating token read at `line`.
pub fn parse_f64(token: &str, line: usize) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| Error::Parse { line, message: format!("invalid number '{token}'") })
}

/// Parse an entry count. Integer text is expected; a non-negative
/// integral float (`2.00000e+00`) is accepted as well.
pub fn parse_count(token: &str, line: usize) -> Result<u64> {
    if let Ok(n) = token.parse::<u64>() {
        return Ok(n);
    }
    let v = parse_f64(token, line)?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
        Ok(v as u64)
    } else {
        Err(Error::Parse { line, message: format!("invalid entry count '{token}'") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_significant_digits() {
        assert_eq!(fmt_f64(1.0), "1.00000e+00");
        assert_eq!(fmt_f64(0.0), "0.00000e+00");
        assert_eq!(fmt_f64(-123456.789), "-1.23457e+05");
        assert_eq!(fmt_f64(1.2345e-5), "1.23450e-05");
        assert_eq!(fmt_f64(6.02e23), "6.02000e+23");
        assert_eq!(fmt_f64(1e-300), "1.00000e-300");
    }

    #[test]
    fn formatted_values_parse_back() {
        for v in [0.0, 1.5, -2.25e-7, 3.0e12] {
            let back = parse_f64(&fmt_f64(v), 1).unwrap();
            assert!((back - v).abs() <= 1e-5 * v.abs());
        }
        assert!(matches!(parse_f64("abc", 7), Err(Error::Parse { line: 7, .. })));
    }

    #[test]
    fn counts() {
        assert_eq!(parse_count("12", 1).unwrap(), 12);
        assert_eq!(parse_count("3.00000e+00", 1).unwrap(), 3);
        assert!(parse_count("-1", 1).is_err());
        assert!(parse_count("1.5", 1).is_err());
    }
}
