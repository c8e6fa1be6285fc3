//! Configuration types for code generation.
//!
//! A [`CodeConfig`] is bound into a coder instance once per evaluation run.
//! Nothing here is process-wide, so two runs with different bit lengths can
//! coexist in one process.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FingerprintError;

/// Fingerprint size in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "u16", into = "u16")]
pub enum Bits {
    #[default]
    B64,
    B128,
    B256,
}

impl Bits {
    pub const ALL: [Bits; 3] = [Bits::B64, Bits::B128, Bits::B256];

    pub fn new(bits: u16) -> Result<Self, FingerprintError> {
        match bits {
            64 => Ok(Bits::B64),
            128 => Ok(Bits::B128),
            256 => Ok(Bits::B256),
            other => Err(FingerprintError::InvalidBits(other)),
        }
    }

    pub fn get(self) -> u16 {
        match self {
            Bits::B64 => 64,
            Bits::B128 => 128,
            Bits::B256 => 256,
        }
    }

    pub fn bytes(self) -> usize {
        usize::from(self.get()) / 8
    }

    /// Number of 64-bit lanes needed to hold a fingerprint of this size.
    pub fn lanes(self) -> usize {
        usize::from(self.get()) / 64
    }

    /// Inverse of [`Bits::bytes`].
    pub fn from_byte_len(len: usize) -> Result<Self, FingerprintError> {
        match len {
            8 => Ok(Bits::B64),
            16 => Ok(Bits::B128),
            32 => Ok(Bits::B256),
            other => Err(FingerprintError::InvalidLength(other)),
        }
    }
}

impl TryFrom<u16> for Bits {
    type Error = FingerprintError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Bits::new(value)
    }
}

impl From<Bits> for u16 {
    fn from(value: Bits) -> Self {
        value.get()
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl FromStr for Bits {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u16 = s
            .trim()
            .parse()
            .map_err(|_| FingerprintError::UnparsableBits(s.to_string()))?;
        Bits::new(raw)
    }
}

/// Perceptual domain a content code is computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualMode {
    Audio,
    Image,
    Text,
    Video,
}

impl PerceptualMode {
    /// Label used in reports, e.g. `Text-Code`.
    pub fn code_type(self) -> String {
        format!("{self}-Code")
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PerceptualMode::Audio => "audio",
            PerceptualMode::Image => "image",
            PerceptualMode::Text => "text",
            PerceptualMode::Video => "video",
        }
    }
}

impl fmt::Display for PerceptualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PerceptualMode::Audio => "Audio",
            PerceptualMode::Image => "Image",
            PerceptualMode::Text => "Text",
            PerceptualMode::Video => "Video",
        };
        f.write_str(label)
    }
}

impl FromStr for PerceptualMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(PerceptualMode::Audio),
            "image" => Ok(PerceptualMode::Image),
            "text" => Ok(PerceptualMode::Text),
            "video" => Ok(PerceptualMode::Video),
            other => Err(format!("unknown perceptual mode `{other}`")),
        }
    }
}

/// Settings bound into a [`crate::ContentCoder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Output fingerprint size.
    pub bits: Bits,
    /// The only mode this coder accepts; files of other modes are rejected.
    pub mode: PerceptualMode,
    /// Tokens per shingle for text codes.
    #[serde(default = "CodeConfig::default_shingle_size")]
    pub shingle_size: usize,
}

impl CodeConfig {
    pub fn new(bits: Bits, mode: PerceptualMode) -> Self {
        Self {
            bits,
            mode,
            shingle_size: Self::default_shingle_size(),
        }
    }

    pub fn with_shingle_size(mut self, k: usize) -> Self {
        self.shingle_size = k;
        self
    }

    pub(crate) fn default_shingle_size() -> usize {
        3
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self::new(Bits::default(), PerceptualMode::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_accepts_only_supported_lengths() {
        assert_eq!(Bits::new(64).unwrap(), Bits::B64);
        assert_eq!(Bits::new(256).unwrap().bytes(), 32);
        assert!(matches!(Bits::new(32), Err(FingerprintError::InvalidBits(32))));
        assert!(matches!("96".parse::<Bits>(), Err(FingerprintError::InvalidBits(96))));
        let err = "abc".parse::<Bits>().unwrap_err();
        assert!(matches!(&err, FingerprintError::UnparsableBits(raw) if raw == "abc"));
        assert!(err.to_string().contains("`abc`"));
        assert!(matches!(
            "70000".parse::<Bits>(),
            Err(FingerprintError::UnparsableBits(_))
        ));
        assert_eq!("128".parse::<Bits>().unwrap().lanes(), 2);
    }

    #[test]
    fn bits_serde_uses_plain_integer() {
        let json = serde_json::to_string(&Bits::B128).unwrap();
        assert_eq!(json, "128");
        assert!(serde_json::from_str::<Bits>("100").is_err());
    }

    #[test]
    fn mode_labels() {
        assert_eq!(PerceptualMode::Audio.code_type(), "Audio-Code");
        assert_eq!("IMAGE".parse::<PerceptualMode>().unwrap(), PerceptualMode::Image);
    }
}
