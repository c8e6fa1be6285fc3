use std::path::PathBuf;

use thiserror::Error;

use crate::config::PerceptualMode;

/// Errors raised while producing or comparing fingerprints.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("unsupported media type for {}", path.display())]
    UnsupportedMediaType { path: PathBuf },
    #[error("{mode} mode is not supported by this coder")]
    UnsupportedMode { mode: PerceptualMode },
    #[error("file {} is {found}, coder is bound to {expected}", path.display())]
    ModeMismatch {
        path: PathBuf,
        expected: PerceptualMode,
        found: PerceptualMode,
    },
    #[error("failed to read {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("no content to fingerprint in {}", path.display())]
    EmptyContent { path: PathBuf },
    #[error("fingerprint length mismatch: {left} bits vs {right} bits")]
    LengthMismatch { left: usize, right: usize },
    #[error("invalid bit length {0}; expected 64, 128 or 256")]
    InvalidBits(u16),
    #[error("invalid bit length `{0}`; expected 64, 128 or 256")]
    UnparsableBits(String),
    #[error("invalid fingerprint length of {0} bytes")]
    InvalidLength(usize),
}

impl FingerprintError {
    /// True for per-file failures a corpus scan recovers from by skipping the file.
    ///
    /// Comparison and configuration errors are never recoverable: they point at
    /// mixed bit lengths or a broken setup.
    pub fn is_unsupported_input(&self) -> bool {
        matches!(
            self,
            FingerprintError::UnsupportedMediaType { .. }
                | FingerprintError::UnsupportedMode { .. }
                | FingerprintError::ModeMismatch { .. }
                | FingerprintError::Unreadable { .. }
                | FingerprintError::EmptyContent { .. }
        )
    }

    pub(crate) fn unreadable<E: std::fmt::Display>(path: &std::path::Path, err: E) -> Self {
        FingerprintError::Unreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}
