//! # Content fingerprints for iscc-eval
//!
//! This crate owns everything the evaluation engine needs to know about a
//! single content code:
//!
//! - [`Fingerprint`]: a 64, 128 or 256 bit binary code.
//! - [`distance`]: the distance oracle (Hamming distance). Comparing codes of
//!   different lengths fails with [`FingerprintError::LengthMismatch`].
//! - [`CodeGenerator`]: the seam to whatever library produces codes. The
//!   generator is constructed with a [`CodeConfig`] and keeps it for its whole
//!   lifetime, so the bit length and mode of a run are explicit values rather
//!   than process-wide state.
//! - [`ContentCoder`]: a built-in generator (SimHash for text, dHash for
//!   images) so the harness runs without an external code library.
//!
//! ## Example
//!
//! ```
//! use fingerprint::{distance, Fingerprint};
//!
//! let a = Fingerprint::from_lanes(&[0b1011]).unwrap();
//! let b = Fingerprint::from_lanes(&[0b0001]).unwrap();
//! assert_eq!(distance(&a, &b).unwrap(), 2);
//! ```

pub mod coder;
pub mod config;
mod dhash;
mod error;
pub mod fingerprint;
pub mod media;
pub mod simhash;

pub use crate::coder::{CodeGenerator, ContentCoder};
pub use crate::config::{Bits, CodeConfig, PerceptualMode};
pub use crate::error::FingerprintError;
pub use crate::fingerprint::{distance, CodeOutput, Fingerprint};
pub use crate::media::detect_mode;
