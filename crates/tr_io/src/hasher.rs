//! Deterministic hashing and the run-record identifier.
//!
//! - Canonical JSON hashing: UTF-8, sorted object keys, array order preserved.
//! - Hex digests are lowercase.
//! - `RUN:` ids pair an RFC3339-UTC timestamp with a hash of canonical bytes,
//!   so the same enriched document at the same pinned instant names the
//!   same run.
//!
//! Use `sha256_canonical(..)` for JSON values/structs (goes through
//! canonical_json) and `sha256_hex(..)` / `sha256_file(..)` for raw bytes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_json_bytes;
use crate::{IoError, IoResult};

/* ----- raw hashing ----- */

/// SHA-256 over raw bytes, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 over a reader stream (raw, not canonicalized).
pub fn sha256_stream<R: Read>(reader: &mut R) -> IoResult<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 256 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over a file's raw bytes.
pub fn sha256_file(path: &Path) -> IoResult<String> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let mut r = BufReader::new(f);
    sha256_stream(&mut r)
}

/* ----- canonical hashing ----- */

/// SHA-256 over canonical JSON bytes of any serializable value.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    let v = serde_json::to_value(value)?;
    Ok(sha256_canonical_value(&v))
}

/// SHA-256 over an already-parsed JSON value, canonicalized first.
pub fn sha256_canonical_value(v: &Value) -> String {
    sha256_hex(&to_canonical_json_bytes(v))
}

/* ----- RUN ids ----- */

/// Normalize a timestamp to canonical RFC3339 UTC seconds with trailing `Z`.
///
/// Accepts:
///   - `YYYY-MM-DDTHH:MM:SSZ`
///   - `YYYY-MM-DDTHH:MM:SS.ssssssZ` (fractional seconds are dropped)
///   - `YYYY-MM-DDTHH:MM:SS[.sss]+00:00` / `-00:00` (normalized to `Z`)
///
/// Non-UTC offsets are rejected so run ids stay comparable across hosts.
pub fn normalize_rfc3339_utc_seconds(ts: &str) -> IoResult<String> {
    let bad = || IoError::Invalid(format!("timestamp must be RFC3339 UTC: {ts}"));

    if ts.len() < 20 {
        return Err(bad());
    }

    let y = ts.get(0..4).and_then(|s| s.parse::<u32>().ok()).ok_or_else(bad)?;
    if ts.get(4..5) != Some("-") {
        return Err(bad());
    }
    let m = ts.get(5..7).and_then(|s| s.parse::<u32>().ok()).ok_or_else(bad)?;
    if ts.get(7..8) != Some("-") {
        return Err(bad());
    }
    let d = ts.get(8..10).and_then(|s| s.parse::<u32>().ok()).ok_or_else(bad)?;
    if ts.get(10..11) != Some("T") {
        return Err(bad());
    }
    let hh = ts.get(11..13).and_then(|s| s.parse::<u32>().ok()).ok_or_else(bad)?;
    if ts.get(13..14) != Some(":") {
        return Err(bad());
    }
    let mm = ts.get(14..16).and_then(|s| s.parse::<u32>().ok()).ok_or_else(bad)?;
    if ts.get(16..17) != Some(":") {
        return Err(bad());
    }
    let ss = ts.get(17..19).and_then(|s| s.parse::<u32>().ok()).ok_or_else(bad)?;

    // Basic range checks (not full calendar validation).
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) || hh > 23 || mm > 59 || ss > 59 {
        return Err(bad());
    }

    // Optional fractional seconds.
    let mut idx = 19;
    if ts.get(idx..idx + 1) == Some(".") {
        idx += 1;
        let start = idx;
        while idx < ts.len() && ts.as_bytes()[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == start {
            return Err(bad());
        }
    }

    match ts.get(idx..) {
        Some("Z") | Some("+00:00") | Some("-00:00") => {}
        _ => return Err(bad()),
    }

    Ok(format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}Z"))
}

/// `RUN:<timestamp>:<hex>` over canonical bytes of the enriched document.
pub fn run_id_from_bytes(timestamp_utc: &str, canonical_bytes: &[u8]) -> IoResult<String> {
    let ts = normalize_rfc3339_utc_seconds(timestamp_utc)?;
    Ok(format!("RUN:{ts}:{}", sha256_hex(canonical_bytes)))
}

/// Convenience: canonicalize a serializable payload, then build its run id.
pub fn run_id_from_canonical<T: Serialize>(timestamp_utc: &str, payload: &T) -> IoResult<String> {
    let v = serde_json::to_value(payload)?;
    run_id_from_bytes(timestamp_utc, &to_canonical_json_bytes(&v))
}
