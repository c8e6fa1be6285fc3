//! Fingerprint values and the distance oracle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{Bits, PerceptualMode};
use crate::error::FingerprintError;

/// A fixed-length binary content code (64, 128 or 256 bits).
///
/// Ordering is plain byte ordering so fingerprints can key ordered maps.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Fingerprint {
    bytes: Vec<u8>,
}

impl Fingerprint {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, FingerprintError> {
        let bytes = bytes.into();
        Bits::from_byte_len(bytes.len())?;
        Ok(Self { bytes })
    }

    /// Build a fingerprint from 64-bit lanes, most significant lane first.
    pub fn from_lanes(lanes: &[u64]) -> Result<Self, FingerprintError> {
        let mut bytes = Vec::with_capacity(lanes.len() * 8);
        for lane in lanes {
            bytes.extend_from_slice(&lane.to_be_bytes());
        }
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bits(&self) -> Bits {
        // Length is validated on construction.
        Bits::from_byte_len(self.bytes.len()).unwrap_or_default()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl TryFrom<Vec<u8>> for Fingerprint {
    type Error = FingerprintError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Fingerprint::from_bytes(value)
    }
}

impl From<Fingerprint> for Vec<u8> {
    fn from(value: Fingerprint) -> Self {
        value.bytes
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Number of differing bits between two fingerprints.
///
/// Fails with [`FingerprintError::LengthMismatch`] when the fingerprints were
/// generated at different bit lengths; such a comparison is a configuration
/// bug and is never coerced.
pub fn distance(a: &Fingerprint, b: &Fingerprint) -> Result<u32, FingerprintError> {
    if a.bytes.len() != b.bytes.len() {
        return Err(FingerprintError::LengthMismatch {
            left: a.bytes.len() * 8,
            right: b.bytes.len() * 8,
        });
    }
    Ok(a.bytes
        .iter()
        .zip(b.bytes.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum())
}

/// Output of a single code generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeOutput {
    pub fingerprint: Fingerprint,
    /// Human readable rendering for diagnostics, e.g. `ISCC:TEXT-64:0f3a...`.
    pub display: String,
}

impl CodeOutput {
    pub fn new(mode: PerceptualMode, fingerprint: Fingerprint) -> Self {
        let display = format!(
            "ISCC:{}-{}:{}",
            mode.as_str().to_ascii_uppercase(),
            fingerprint.bits(),
            fingerprint.to_hex()
        );
        Self {
            fingerprint,
            display,
        }
    }
}
