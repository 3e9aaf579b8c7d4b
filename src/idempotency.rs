use sha2::{Digest, Sha256};

/// Deterministic upsert key for a listing: SHA-256 over `source_id|url|title`.
///
/// A missing title hashes the same as an empty one.
pub fn build_listing_hash(source_id: &str, url: &str, title: Option<&str>) -> String {
    let mut s = String::with_capacity(source_id.len() + url.len() + 2);
    s.push_str(source_id);
    s.push('|');
    s.push_str(url);
    s.push('|');
    if let Some(t) = title {
        s.push_str(t);
    }

    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}
