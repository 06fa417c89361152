//! Infra entity identifiers.
//!
//! The service mints unsigned 64-bit IDs and transports them as base58 strings
//! using the Bitcoin alphabet. An encoded ID is never longer than 11 characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const MAX_LEN: usize = 11;

/// Reasons an ID string fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The input was empty.
    #[error("invalid base58: empty")]
    Empty,

    /// The input contained a byte outside the base58 alphabet.
    #[error("invalid base58: byte {0} is out of range")]
    OutOfRange(usize),

    /// The input was longer than any encoded u64.
    #[error("invalid base58: too long")]
    TooLong,

    /// The decoded value does not fit in 64 bits.
    #[error("invalid base58: value overflows")]
    Overflow,
}

/// An entity ID minted by the Infra service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Id(u64);

impl Id {
    /// Wrap a raw numeric ID.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Zero marks an unset reference in API payloads (e.g. a grant with no user).
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a base58-encoded ID.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if s.len() > MAX_LEN {
            return Err(IdError::TooLong);
        }

        let mut value: u64 = 0;
        for (i, b) in s.bytes().enumerate() {
            let digit = decode_digit(b).ok_or(IdError::OutOfRange(i))?;
            value = value
                .checked_mul(58)
                .and_then(|v| v.checked_add(u64::from(digit)))
                .ok_or(IdError::Overflow)?;
        }
        Ok(Self(value))
    }
}

fn decode_digit(b: u8) -> Option<u8> {
    ALPHABET.iter().position(|&c| c == b).map(|p| p as u8)
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = self.0;
        if n == 0 {
            return f.write_str("1");
        }

        let mut buf = [0u8; MAX_LEN];
        let mut pos = MAX_LEN;
        while n > 0 {
            pos -= 1;
            buf[pos] = ALPHABET[(n % 58) as usize];
            n /= 58;
        }
        // the alphabet is ASCII
        f.write_str(std::str::from_utf8(&buf[pos..]).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for Id {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Self(0));
        }
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_agree() {
        for raw in [1u64, 57, 58, 3364, 71_697_386_029_563_904, u64::MAX] {
            let id = Id::new(raw);
            assert_eq!(Id::parse(&id.to_string()), Ok(id));
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(Id::new(0).to_string(), "1");
        assert_eq!(Id::new(57).to_string(), "z");
        assert_eq!(Id::new(58).to_string(), "21");
        assert_eq!(Id::new(u64::MAX).to_string(), "jpXCZedGfVQ");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Id::parse(""), Err(IdError::Empty));
        assert_eq!(Id::parse("0"), Err(IdError::OutOfRange(0)));
        assert_eq!(Id::parse("abcI"), Err(IdError::OutOfRange(3)));
        assert_eq!(Id::parse("123456789012"), Err(IdError::TooLong));
        assert_eq!(Id::parse("zzzzzzzzzzz"), Err(IdError::Overflow));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Id::parse("0").unwrap_err().to_string(),
            "invalid base58: byte 0 is out of range"
        );
        assert_eq!(
            Id::parse("123456789012").unwrap_err().to_string(),
            "invalid base58: too long"
        );
    }

    #[test]
    fn test_serde_as_string() {
        let id = Id::new(3364);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"211\"");
        let back: Id = serde_json::from_str("\"211\"").unwrap();
        assert_eq!(back, id);
        let empty: Id = serde_json::from_str("\"\"").unwrap();
        assert!(empty.is_zero());
    }
}
