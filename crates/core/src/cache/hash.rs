//! Content-derived validators for conditional GET.

use sha2::{Digest, Sha256};

/// Compute the ETag (unquoted) of a rendered body.
pub fn compute_etag(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// Whether an `If-None-Match` header value matches `etag`.
///
/// Accepts a comma-separated list of strong or weak validators, quoted or
/// bare, and the `*` wildcard.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate.trim_matches('"') == etag
    })
}
