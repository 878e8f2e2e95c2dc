use std::fs;
use std::path::{Path, PathBuf};

/// Key for one cached completion: crc32 of the serialized request plus its
/// length, so identical requests map to identical files.
#[must_use]
pub fn cache_key(payload_json: &str) -> String {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload_json.as_bytes());
    format!("{:08x}-{:x}", hasher.finalize(), payload_json.len())
}

#[must_use]
pub fn lookup_cached_completion(cache_dir: &Path, key: &str) -> Option<String> {
    let path = cache_file(cache_dir, key);
    fs::read_to_string(path).ok()
}

/// Persist a completed response. Best-effort: callers treat a failed write
/// as a cache miss on the next run, not as a request failure.
pub fn store_cached_completion(
    cache_dir: &Path,
    key: &str,
    completion: &str,
) -> std::io::Result<()> {
    fs::create_dir_all(cache_dir)?;
    fs::write(cache_file(cache_dir, key), completion)
}

fn cache_file(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(format!("{key}.txt"))
}
