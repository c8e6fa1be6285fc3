//! The code generator seam and the built-in content coder.

use std::fs;
use std::path::Path;

use tracing::trace;

use crate::config::{CodeConfig, PerceptualMode};
use crate::dhash::dhash;
use crate::error::FingerprintError;
use crate::fingerprint::{CodeOutput, Fingerprint};
use crate::media::detect_mode;
use crate::simhash::{shingles, simhash, tokenize};

/// Produces a content code for a file.
///
/// Implementations are bound to a single [`CodeConfig`] for their whole
/// lifetime; every code from one generator has the same bit length and mode.
pub trait CodeGenerator: Send + Sync {
    /// Configuration this generator was constructed with.
    fn config(&self) -> &CodeConfig;

    /// Generate the content code for `path`.
    fn code(&self, path: &Path) -> Result<CodeOutput, FingerprintError>;
}

/// Built-in generator: SimHash for text, dHash for images.
///
/// Audio and video are recognised but reported as
/// [`FingerprintError::UnsupportedMode`].
#[derive(Debug, Clone)]
pub struct ContentCoder {
    cfg: CodeConfig,
}

impl ContentCoder {
    pub fn new(cfg: CodeConfig) -> Self {
        Self { cfg }
    }

    fn code_text(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let text = fs::read_to_string(path).map_err(|e| FingerprintError::unreadable(path, e))?;
        let tokens = tokenize(&text);
        if tokens.is_empty() {
            return Err(FingerprintError::EmptyContent {
                path: path.to_path_buf(),
            });
        }
        let features = shingles(&tokens, self.cfg.shingle_size);
        Fingerprint::from_lanes(&simhash(&features, self.cfg.bits))
    }

    fn code_image(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        let img = image::open(path).map_err(|e| FingerprintError::unreadable(path, e))?;
        Fingerprint::from_lanes(&dhash(&img, self.cfg.bits))
    }
}

impl CodeGenerator for ContentCoder {
    fn config(&self) -> &CodeConfig {
        &self.cfg
    }

    fn code(&self, path: &Path) -> Result<CodeOutput, FingerprintError> {
        let found = detect_mode(path).ok_or_else(|| FingerprintError::UnsupportedMediaType {
            path: path.to_path_buf(),
        })?;
        if found != self.cfg.mode {
            return Err(FingerprintError::ModeMismatch {
                path: path.to_path_buf(),
                expected: self.cfg.mode,
                found,
            });
        }

        let fingerprint = match found {
            PerceptualMode::Text => self.code_text(path)?,
            PerceptualMode::Image => self.code_image(path)?,
            mode @ (PerceptualMode::Audio | PerceptualMode::Video) => {
                return Err(FingerprintError::UnsupportedMode { mode });
            }
        };

        let output = CodeOutput::new(found, fingerprint);
        trace!(path = %path.display(), code = %output.display, "code_generated");
        Ok(output)
    }
}
