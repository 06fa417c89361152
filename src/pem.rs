//! Minimal PEM block decoding for server certificates.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Block type of an X.509 certificate.
pub const CERTIFICATE: &str = "CERTIFICATE";

/// Errors while loading a PEM block.
#[derive(Debug, Error)]
pub enum PemError {
    /// No block of the wanted type could be decoded.
    #[error("failed to decode PEM block containing {0}")]
    Decode(String),

    /// The file could not be read.
    #[error("{path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    /// The label after `BEGIN`, e.g. `CERTIFICATE`.
    pub label: String,
    /// The base64-decoded body.
    pub contents: Vec<u8>,
}

impl PemBlock {
    /// Re-encode the block as PEM text with 64-column lines.
    pub fn to_pem(&self) -> String {
        let body = STANDARD.encode(&self.contents);
        let mut out = format!("-----BEGIN {}-----\n", self.label);
        for chunk in body.as_bytes().chunks(64) {
            out.push_str(&String::from_utf8_lossy(chunk));
            out.push('\n');
        }
        out.push_str(&format!("-----END {}-----\n", self.label));
        out
    }
}

/// Decode the first PEM block in `data`, requiring its label to be `label`.
pub fn decode(data: &str, label: &str) -> Result<PemBlock, PemError> {
    let err = || PemError::Decode(label.to_lowercase());

    let block = first_block(data).ok_or_else(err)?;
    if block.label != label {
        return Err(err());
    }
    Ok(block)
}

/// Read `path` and decode its first PEM block, requiring the label `label`.
pub fn decode_file(path: impl AsRef<Path>, label: &str) -> Result<PemBlock, PemError> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|source| PemError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode(&data, label)
}

fn first_block(data: &str) -> Option<PemBlock> {
    let mut lines = data.lines().map(str::trim);
    let label = lines.find_map(|line| {
        line.strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
    })?;

    let end = format!("-----END {}-----", label);
    let mut body = String::new();
    let mut closed = false;
    for line in lines {
        if line == end {
            closed = true;
            break;
        }
        // skip RFC 1421 headers
        if line.contains(':') {
            continue;
        }
        body.push_str(line);
    }
    if !closed {
        return None;
    }

    let contents = STANDARD.decode(body.as_bytes()).ok()?;
    Some(PemBlock {
        label: label.to_string(),
        contents,
    })
}
