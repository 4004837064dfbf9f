//! The run manifest: a small offline JSON file naming the two inputs.
//!
//! Policy:
//! - Paths are relative to the manifest's directory. Absolute paths and
//!   anything carrying a URL scheme are rejected; runs are strictly offline.
//! - Optional sha256 pins (lowercase 64-hex) are verified over canonical
//!   JSON bytes, so formatting differences do not break pinning.
//! - `id` and `notes` are non-normative and never enter any digest.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical_json::to_canonical_json_bytes;
use crate::hasher::sha256_hex;
use crate::loader::{read_bytes_limited, MAX_ENGINE_RESULT_BYTES, MAX_REQUEST_BYTES};
use crate::{looks_like_url, IoError, IoResult};

/// Size cap for manifest documents.
pub const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

/// External manifest accepted by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimManifest {
    /// Optional user-provided identifier (non-normative).
    #[serde(default)]
    pub id: Option<String>,

    pub request_path: String,
    pub engine_result_path: String,

    #[serde(default)]
    pub expect: Option<ManifestExpect>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Optional sha256 pins for the two inputs (lowercase 64-hex, canonical bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestExpect {
    #[serde(default)]
    pub request_sha256: Option<String>,
    #[serde(default)]
    pub engine_result_sha256: Option<String>,
}

/// Manifest paths resolved against the manifest's directory.
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub request_path: PathBuf,
    pub engine_result_path: PathBuf,
    pub expect: Option<ManifestExpect>,
}

/* ---------------- helpers ---------------- */

fn is_lower_hex_64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn path_check(label: &str, raw: &str) -> IoResult<()> {
    if raw.is_empty() {
        return Err(IoError::Manifest(format!("{label} must not be empty")));
    }
    if looks_like_url(raw) {
        return Err(IoError::Manifest(format!(
            "{label} must be an offline path: {raw}"
        )));
    }
    if Path::new(raw).is_absolute() {
        return Err(IoError::Manifest(format!(
            "{label} must be relative to the manifest: {raw}"
        )));
    }
    Ok(())
}

fn digest_check(label: &str, hex: &Option<String>) -> IoResult<()> {
    if let Some(h) = hex {
        if !is_lower_hex_64(h) {
            return Err(IoError::Manifest(format!(
                "{label} must be lowercase 64-hex: {h}"
            )));
        }
    }
    Ok(())
}

/* ---------------- validate / resolve / verify ---------------- */

/// Validate manifest shape and offline path policy. No filesystem access.
pub fn validate_manifest(man: &SimManifest) -> IoResult<()> {
    path_check("request_path", &man.request_path)?;
    path_check("engine_result_path", &man.engine_result_path)?;
    if let Some(exp) = &man.expect {
        digest_check("expect.request_sha256", &exp.request_sha256)?;
        digest_check("expect.engine_result_sha256", &exp.engine_result_sha256)?;
    }
    Ok(())
}

/// Resolve manifest paths under `base_dir` and ensure both inputs exist
/// as files.
pub fn resolve_paths(base_dir: &Path, man: &SimManifest) -> IoResult<ResolvedManifest> {
    let request = base_dir.join(&man.request_path);
    let engine_result = base_dir.join(&man.engine_result_path);
    must_exist_file("request_path", &request)?;
    must_exist_file("engine_result_path", &engine_result)?;
    Ok(ResolvedManifest {
        request_path: request,
        engine_result_path: engine_result,
        expect: man.expect.clone(),
    })
}

fn must_exist_file(label: &str, p: &Path) -> IoResult<()> {
    let md = std::fs::metadata(p)
        .map_err(|e| IoError::Manifest(format!("cannot access {label}: {} ({e})", p.display())))?;
    if !md.is_file() {
        return Err(IoError::Manifest(format!(
            "{label} is not a file: {}",
            p.display()
        )));
    }
    Ok(())
}

/// Load a manifest, validate it, and resolve paths under its directory.
/// Digest pins are not checked here; see [`verify_expectations`].
pub fn load_and_resolve(manifest_path: &Path) -> IoResult<ResolvedManifest> {
    let bytes = read_bytes_limited(manifest_path, MAX_MANIFEST_BYTES)?;
    let man: SimManifest = serde_json::from_slice(&bytes)
        .map_err(|e| IoError::Manifest(format!("{}: {e}", manifest_path.display())))?;
    validate_manifest(&man)?;
    let base = manifest_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    resolve_paths(&base, &man)
}

/// Verify any sha256 pins over canonical JSON bytes of the two inputs.
pub fn verify_expectations(resolved: &ResolvedManifest) -> IoResult<()> {
    let Some(exp) = &resolved.expect else {
        return Ok(());
    };
    if let Some(want) = &exp.request_sha256 {
        check_one("request_path", &resolved.request_path, MAX_REQUEST_BYTES, want)?;
    }
    if let Some(want) = &exp.engine_result_sha256 {
        check_one(
            "engine_result_path",
            &resolved.engine_result_path,
            MAX_ENGINE_RESULT_BYTES,
            want,
        )?;
    }
    Ok(())
}

fn check_one(label: &str, path: &Path, cap: u64, want: &str) -> IoResult<()> {
    let bytes = read_bytes_limited(path, cap)?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| IoError::Manifest(format!("{label} is not JSON: {} ({e})", path.display())))?;
    let got = sha256_hex(&to_canonical_json_bytes(&value));
    if got != want {
        return Err(IoError::Expect(format!("{label}: expected {want} got {got}")));
    }
    Ok(())
}
