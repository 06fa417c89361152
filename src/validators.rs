//! Attribute value validators.
//!
//! Each check runs on the configured value before anything is sent to the
//! Infra API. Validators are attached to schema attributes and invoked by
//! [`crate::validation`], which turns every returned message into an error
//! diagnostic on the attribute's path.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::duration::GoDuration;
use crate::id::Id;
use crate::pem;

const NAME_HINT: &str = "Name may contain only letters (uppercase and lowercase), numbers, underscores `_`, hyphens `-`, and periods `.`.";

/// A check applied to a single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// A base58-encoded Infra ID.
    Id,
    /// A bare email address with a dotted domain.
    Email,
    /// A user-facing object name.
    Name,
    /// A Go duration string.
    Duration,
    /// A PEM-encoded certificate.
    PemCertificate,
    /// A path to a file holding a PEM-encoded certificate.
    PemCertificateFile,
    /// An absolute `https://` URL with a host.
    HttpsUrl,
    /// An RFC 3339 timestamp.
    Rfc3339,
    /// A JSON document.
    Json,
    /// One of a fixed set of strings.
    OneOf {
        /// Accepted values.
        values: Vec<&'static str>,
        /// Compare ignoring ASCII case.
        ignore_case: bool,
    },
    /// A string of at least this many bytes.
    MinLength(usize),
    /// An integer no smaller than this.
    IntAtLeast(i64),
}

impl Validator {
    /// Check `value`, returning one message per problem found.
    ///
    /// Values of the wrong JSON type are left to the type checker.
    pub fn check(&self, path: &str, value: &Value) -> Vec<String> {
        if let Self::IntAtLeast(min) = self {
            return match value.as_i64() {
                Some(v) => int_at_least(path, v, *min).err().into_iter().collect(),
                None => Vec::new(),
            };
        }

        let Some(s) = value.as_str() else {
            return Vec::new();
        };

        match self {
            Self::Id => string_is_id(s).err().into_iter().collect(),
            Self::Email => string_is_email(s).err().into_iter().collect(),
            Self::Name => string_is_name(path, s),
            Self::Duration => string_is_duration(s).err().into_iter().collect(),
            Self::PemCertificate => string_is_pem_certificate(s).err().into_iter().collect(),
            Self::PemCertificateFile => pem::decode_file(s, pem::CERTIFICATE)
                .err()
                .map(|e| e.to_string())
                .into_iter()
                .collect(),
            Self::HttpsUrl => string_is_https_url(path, s).err().into_iter().collect(),
            Self::Rfc3339 => string_is_rfc3339(path, s).err().into_iter().collect(),
            Self::Json => string_is_json(path, s).err().into_iter().collect(),
            Self::OneOf {
                values,
                ignore_case,
            } => string_in_slice(path, s, values, *ignore_case)
                .err()
                .into_iter()
                .collect(),
            Self::MinLength(min) => string_min_length(path, s, *min)
                .err()
                .into_iter()
                .collect(),
            Self::IntAtLeast(_) => Vec::new(),
        }
    }
}

/// The string parses as an Infra ID.
pub fn string_is_id(s: &str) -> Result<(), String> {
    Id::parse(s).map(|_| ()).map_err(|e| e.to_string())
}

/// The string is a single email address with no display name and a domain
/// containing at least one `.`.
pub fn string_is_email(s: &str) -> Result<(), String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("mail: no address".to_string());
    }

    let addr = match s.find('<') {
        Some(open) => {
            let inner = s[open + 1..]
                .strip_suffix('>')
                .ok_or_else(|| "mail: unclosed angle-addr".to_string())?;
            if !s[..open].trim().is_empty() {
                return Err("mail: must not contain display name".to_string());
            }
            inner
        }
        None => s,
    };

    let (local, domain) = addr
        .rsplit_once('@')
        .ok_or_else(|| "mail: missing '@' or angle-addr".to_string())?;
    if !is_dot_atom(local) {
        return Err("mail: invalid string".to_string());
    }
    if domain.is_empty() {
        return Err("mail: no domain in addr-spec".to_string());
    }
    if !is_dot_atom(domain) {
        return Err("mail: invalid domain".to_string());
    }
    if !domain.contains('.') {
        return Err("mail: missing '.' in address domain".to_string());
    }
    Ok(())
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

fn is_dot_atom(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

fn name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[A-Za-z0-9_\-.]+$").expect("invalid name pattern"))
}

/// The string matches `^[\w\-.]+$` and is 2 to 256 bytes long.
///
/// Both rules are checked so an empty name reports two problems.
pub fn string_is_name(path: &str, s: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if !name_regex().is_match(s) {
        errors.push(format!("invalid value for {} ({})", path, NAME_HINT));
    }
    if !(2..=256).contains(&s.len()) {
        errors.push(format!(
            "expected length of {} to be in the range (2 - 256), got {}",
            path, s
        ));
    }
    errors
}

/// The string parses as a Go duration.
pub fn string_is_duration(s: &str) -> Result<(), String> {
    GoDuration::parse(s).map(|_| ()).map_err(|e| e.to_string())
}

/// The string is a PEM block of type `CERTIFICATE`.
pub fn string_is_pem_certificate(s: &str) -> Result<(), String> {
    pem::decode(s, pem::CERTIFICATE)
        .map(|_| ())
        .map_err(|_| "failed to decode PEM block containing public key".to_string())
}

/// The string is an absolute `https` URL with a host.
pub fn string_is_https_url(path: &str, s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err(format!("expected {:?} url to not be empty, got {}", path, s));
    }
    let url = url::Url::parse(s).map_err(|e| format!("{:?}: {}", path, e))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("expected {:?} to have a host, got {}", path, s));
    }
    if url.scheme() != "https" {
        return Err(format!(
            "expected {:?} to have a url with schema of: \"https\", got {}",
            path, s
        ));
    }
    Ok(())
}

/// The string is an RFC 3339 timestamp.
pub fn string_is_rfc3339(path: &str, s: &str) -> Result<(), String> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|_| ())
        .map_err(|e| format!("{:?}: invalid RFC3339 value {:?}: {}", path, s, e))
}

/// The string is a JSON document.
pub fn string_is_json(path: &str, s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err(format!("{:?} contains an invalid JSON: empty string", path));
    }
    serde_json::from_str::<Value>(s)
        .map(|_| ())
        .map_err(|e| format!("{:?} contains an invalid JSON: {}", path, e))
}

/// The string is one of `values`.
pub fn string_in_slice(
    path: &str,
    s: &str,
    values: &[&str],
    ignore_case: bool,
) -> Result<(), String> {
    let found = values.iter().any(|v| {
        if ignore_case {
            v.eq_ignore_ascii_case(s)
        } else {
            *v == s
        }
    });
    if found {
        Ok(())
    } else {
        Err(format!(
            "expected {} to be one of {:?}, got {}",
            path, values, s
        ))
    }
}

/// The string is at least `min` bytes long.
pub fn string_min_length(path: &str, s: &str, min: usize) -> Result<(), String> {
    if s.len() < min {
        Err(format!("expected length for {} is at least {}", path, min))
    } else {
        Ok(())
    }
}

/// The integer is at least `min`.
pub fn int_at_least(path: &str, v: i64, min: i64) -> Result<(), String> {
    if v < min {
        Err(format!("expected {} to be at least ({}), got {}", path, min, v))
    } else {
        Ok(())
    }
}
