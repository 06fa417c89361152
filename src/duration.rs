//! Go-style duration strings.
//!
//! The Infra API encodes spans such as access key lifetimes as Go duration
//! strings (`"720h0m0s"`, `"1.5s"`, `"300ms"`), and users write them the same
//! way in configuration. [`GoDuration`] parses and prints that format exactly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const NANOSECOND: u64 = 1;
const MICROSECOND: u64 = 1_000 * NANOSECOND;
const MILLISECOND: u64 = 1_000 * MICROSECOND;
const SECOND: u64 = 1_000 * MILLISECOND;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;

/// A duration string that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// Malformed number, sign, or overflow.
    #[error("time: invalid duration \"{0}\"")]
    Invalid(String),

    /// A number without a unit suffix.
    #[error("time: missing unit in duration \"{0}\"")]
    MissingUnit(String),

    /// A unit suffix other than ns, us, µs, ms, s, m, h.
    #[error("time: unknown unit \"{unit}\" in duration \"{input}\"")]
    UnknownUnit {
        /// The unrecognised suffix.
        unit: String,
        /// The full input.
        input: String,
    },
}

/// A signed span of time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GoDuration(i64);

impl GoDuration {
    /// The zero duration.
    pub const ZERO: Self = Self(0);

    /// Build from nanoseconds.
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Build from whole seconds, saturating on overflow.
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(SECOND as i64))
    }

    /// Build from whole hours, saturating on overflow.
    pub const fn from_hours(hours: i64) -> Self {
        Self(hours.saturating_mul(HOUR as i64))
    }

    /// Nanoseconds in this span.
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Round toward zero to a multiple of one second.
    pub const fn truncate_to_seconds(self) -> Self {
        Self(self.0 - self.0 % SECOND as i64)
    }

    /// Convert from a chrono duration, saturating when out of range.
    pub fn from_chrono(d: chrono::Duration) -> Self {
        match d.num_nanoseconds() {
            Some(n) => Self(n),
            None if d < chrono::Duration::zero() => Self(i64::MIN),
            None => Self(i64::MAX),
        }
    }

    /// Parse a Go duration string such as `"300ms"`, `"-1.5h"` or `"2h45m"`.
    pub fn parse(input: &str) -> Result<Self, DurationError> {
        let invalid = || DurationError::Invalid(input.to_string());

        let mut s = input;
        let mut neg = false;
        if let Some(c) = s.chars().next() {
            if c == '-' || c == '+' {
                neg = c == '-';
                s = &s[1..];
            }
        }
        if s == "0" {
            return Ok(Self::ZERO);
        }
        if s.is_empty() {
            return Err(invalid());
        }

        let limit = 1u64 << 63;
        let mut total: u64 = 0;
        while !s.is_empty() {
            let first = s.as_bytes()[0];
            if !(first == b'.' || first.is_ascii_digit()) {
                return Err(invalid());
            }

            let (whole, rest) = leading_int(s).ok_or_else(invalid)?;
            let pre = rest.len() != s.len();
            s = rest;

            let mut frac = 0u64;
            let mut scale = 1f64;
            let mut post = false;
            if let Some(rest) = s.strip_prefix('.') {
                let (f, sc, rest2) = leading_fraction(rest);
                post = rest2.len() != rest.len();
                frac = f;
                scale = sc;
                s = rest2;
            }
            if !pre && !post {
                return Err(invalid());
            }

            let unit_len = s
                .bytes()
                .position(|b| b == b'.' || b.is_ascii_digit())
                .unwrap_or(s.len());
            if unit_len == 0 {
                return Err(DurationError::MissingUnit(input.to_string()));
            }
            let (unit_str, rest) = s.split_at(unit_len);
            s = rest;

            let unit = unit_nanos(unit_str).ok_or_else(|| DurationError::UnknownUnit {
                unit: unit_str.to_string(),
                input: input.to_string(),
            })?;

            if whole > limit / unit {
                return Err(invalid());
            }
            let mut v = whole * unit;
            if frac > 0 {
                v += (frac as f64 * (unit as f64 / scale)) as u64;
                if v > limit {
                    return Err(invalid());
                }
            }
            total = total.checked_add(v).ok_or_else(invalid)?;
            if total > limit {
                return Err(invalid());
            }
        }

        if neg {
            // -(1<<63) is representable
            return Ok(Self((total as i128).wrapping_neg() as i64));
        }
        if total > limit - 1 {
            return Err(invalid());
        }
        Ok(Self(total as i64))
    }
}

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(NANOSECOND),
        "us" | "\u{00b5}s" | "\u{03bc}s" => Some(MICROSECOND),
        "ms" => Some(MILLISECOND),
        "s" => Some(SECOND),
        "m" => Some(MINUTE),
        "h" => Some(HOUR),
        _ => None,
    }
}

fn leading_int(s: &str) -> Option<(u64, &str)> {
    let end = s.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
    let mut x: u64 = 0;
    for b in s[..end].bytes() {
        if x > (1u64 << 63) / 10 {
            return None;
        }
        x = x * 10 + u64::from(b - b'0');
        if x > 1u64 << 63 {
            return None;
        }
    }
    Some((x, &s[end..]))
}

fn leading_fraction(s: &str) -> (u64, f64, &str) {
    let end = s.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
    let mut x: u64 = 0;
    let mut scale = 1f64;
    let mut overflow = false;
    for b in s[..end].bytes() {
        if overflow {
            continue;
        }
        if x > (i64::MAX as u64) / 10 {
            overflow = true;
            continue;
        }
        let y = x * 10 + u64::from(b - b'0');
        if y > 1u64 << 63 {
            overflow = true;
            continue;
        }
        x = y;
        scale *= 10.0;
    }
    (x, scale, &s[end..])
}

/// Writes `v / 10^prec` with the fractional digits, trailing zeros dropped.
fn fmt_frac(out: &mut String, v: u64, prec: u32) -> u64 {
    let mut digits = Vec::with_capacity(prec as usize);
    let mut v = v;
    let mut printed = false;
    for _ in 0..prec {
        let digit = v % 10;
        printed = printed || digit != 0;
        if printed {
            digits.push((b'0' + digit as u8) as char);
        }
        v /= 10;
    }
    if printed {
        out.push('.');
        out.extend(digits.iter().rev());
    }
    v
}

impl fmt::Display for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }

        let neg = self.0 < 0;
        let mut u = self.0.unsigned_abs();
        let mut out = String::new();

        if u < SECOND {
            let (prec, unit) = if u < MICROSECOND {
                (0, "ns")
            } else if u < MILLISECOND {
                (3, "\u{00b5}s")
            } else {
                (6, "ms")
            };
            let mut frac = String::new();
            let whole = fmt_frac(&mut frac, u, prec);
            out.push_str(&whole.to_string());
            out.push_str(&frac);
            out.push_str(unit);
        } else {
            let mut frac = String::new();
            u = fmt_frac(&mut frac, u, 9);
            let secs = format!("{}{}s", u % 60, frac);
            u /= 60;
            if u > 0 {
                let mins = u % 60;
                u /= 60;
                if u > 0 {
                    out.push_str(&format!("{}h", u));
                }
                out.push_str(&format!("{}m", mins));
            }
            out.push_str(&secs);
        }

        if neg {
            f.write_str("-")?;
        }
        f.write_str(&out)
    }
}

impl FromStr for GoDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for GoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GoDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Two duration strings describe the same span.
///
/// Unparseable input never compares equal, so it still shows up as a change.
pub fn equivalent(a: &str, b: &str) -> bool {
    match (GoDuration::parse(a), GoDuration::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(GoDuration::parse("0").unwrap(), GoDuration::ZERO);
        assert_eq!(GoDuration::parse("300ms").unwrap().as_nanos(), 300_000_000);
        assert_eq!(GoDuration::parse("2h45m").unwrap().as_nanos(), 9_900 * SECOND as i64);
        assert_eq!(GoDuration::parse("1.5s").unwrap().as_nanos(), 1_500_000_000);
        assert_eq!(GoDuration::parse(".5s").unwrap().as_nanos(), 500_000_000);
        assert_eq!(GoDuration::parse("-1h").unwrap(), GoDuration::from_hours(-1));
        assert_eq!(GoDuration::parse("+10us").unwrap().as_nanos(), 10_000);
        assert_eq!(GoDuration::parse("1\u{00b5}s").unwrap().as_nanos(), 1_000);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(GoDuration::parse(""), Err(DurationError::Invalid(_))));
        assert!(matches!(GoDuration::parse("-"), Err(DurationError::Invalid(_))));
        assert!(matches!(GoDuration::parse("abc"), Err(DurationError::Invalid(_))));
        assert!(matches!(GoDuration::parse("."), Err(DurationError::Invalid(_))));
        assert!(matches!(GoDuration::parse("10"), Err(DurationError::MissingUnit(_))));
        assert!(matches!(
            GoDuration::parse("3d"),
            Err(DurationError::UnknownUnit { .. })
        ));
        assert!(matches!(
            GoDuration::parse("9999999999999999999h"),
            Err(DurationError::Invalid(_))
        ));
    }

    #[test]
    fn test_error_messages_match_go() {
        assert_eq!(
            GoDuration::parse("10").unwrap_err().to_string(),
            "time: missing unit in duration \"10\""
        );
        assert_eq!(
            GoDuration::parse("3d").unwrap_err().to_string(),
            "time: unknown unit \"d\" in duration \"3d\""
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(GoDuration::ZERO.to_string(), "0s");
        assert_eq!(GoDuration::from_hours(720).to_string(), "720h0m0s");
        assert_eq!(GoDuration::from_secs(90).to_string(), "1m30s");
        assert_eq!(GoDuration::from_nanos(1_500_000_000).to_string(), "1.5s");
        assert_eq!(GoDuration::from_nanos(1_500_000).to_string(), "1.5ms");
        assert_eq!(GoDuration::from_nanos(1_500).to_string(), "1.5\u{00b5}s");
        assert_eq!(GoDuration::from_nanos(42).to_string(), "42ns");
        assert_eq!(GoDuration::from_secs(-5).to_string(), "-5s");
    }

    #[test]
    fn test_ten_years() {
        // 10 * 365.25 days
        let d = GoDuration::from_hours(87_660);
        assert_eq!(d.to_string(), "87660h0m0s");
        assert_eq!(GoDuration::parse("87660h").unwrap(), d);
    }

    #[test]
    fn test_truncate_to_seconds() {
        let d = GoDuration::from_nanos(2_999_999_999);
        assert_eq!(d.truncate_to_seconds(), GoDuration::from_secs(2));
    }

    #[test]
    fn test_equivalent() {
        assert!(equivalent("720h", "720h0m0s"));
        assert!(equivalent("60m", "1h"));
        assert!(!equivalent("1h", "2h"));
        assert!(!equivalent("bogus", "bogus"));
    }
}
