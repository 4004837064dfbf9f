//! tr_io — I/O layer for the tax-reform transition simulator.
//!
//! Everything that touches the filesystem or the wire lives here:
//!
//! - `loader`: size-capped JSON reads, the strict `SimulationRequest` parse,
//!   and the lenient [`loader::EngineResult`] wire model (absent or malformed
//!   numeric fields coerce to zero instead of failing the run)
//! - `manifest`: the offline run manifest naming the two input files
//! - `canonical_json`: sorted-key, compact JSON bytes and atomic file writes
//! - `hasher`: SHA-256 digests over canonical bytes and `RUN:` identifiers
//!
//! All modules share one error type, [`IoError`].

#![forbid(unsafe_code)]

use thiserror::Error;

/// Unified error for tr_io (used by loader/manifest/canonical_json/hasher).
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, fsync).
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Manifest shape or offline-policy violations.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// An input exceeded its size cap.
    #[error("input too large: {0}")]
    Limit(String),

    /// A manifest digest expectation did not match the loaded input.
    #[error("expectation mismatch: {0}")]
    Expect(String),

    /// Generic validation / invariants.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json does not keep a pointer; report the root and let callers
        // enrich the message at higher layers.
        IoError::Json {
            pointer: "/".to_string(),
            msg: e.to_string(),
        }
    }
}

/* ---------------- Public modules ---------------- */

pub mod canonical_json;
pub mod hasher;
pub mod loader;
pub mod manifest;

/// Returns true if `s` looks like a URL (any `<scheme>://`, including `file://`).
/// Manifest loading follows a strict offline posture; use this to reject early.
#[inline]
pub fn looks_like_url(s: &str) -> bool {
    s.trim().contains("://")
}

/* ---------------- Public prelude ---------------- */

pub mod prelude {
    pub use crate::{looks_like_url, IoError, IoResult};

    pub use crate::canonical_json::{to_canonical_json_bytes, write_canonical_file};
    pub use crate::hasher::{sha256_canonical, sha256_canonical_value, sha256_hex};
    pub use crate::loader::{
        load_engine_result, load_inputs, load_request, EngineResult, LoadedInputs,
    };
    pub use crate::manifest::{
        load_and_resolve, verify_expectations, ResolvedManifest, SimManifest,
    };
}
