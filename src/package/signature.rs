use crate::core::{YalcError, YalcResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use yalc_core::core::path::to_slash;

/// Bytes kept from each blake3 digest (rendered as 32 hex chars).
const DIGEST_BYTES: usize = 16;

/// Length of the version suffix derived from a signature.
pub const SHORT_SIGNATURE_LEN: usize = 8;

/// Digest of one file, tagged with its forward-slash relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub rel_path: String,
    pub digest: String,
}

/// Hash one file: the normalized relative path first, then the streamed
/// content.
pub fn file_digest(path: &Path, rel_path: &Path) -> YalcResult<FileDigest> {
    let rel_path = to_slash(rel_path);
    let mut hasher = blake3::Hasher::new();
    hasher.update(rel_path.as_bytes());

    let mut reader = BufReader::new(File::open(path)?);
    std::io::copy(&mut reader, &mut hasher)?;

    Ok(FileDigest {
        rel_path,
        digest: truncated_hex(&hasher),
    })
}

/// Async wrapper around [`file_digest`] for fan-out from the runtime.
pub async fn file_digest_async(
    path: std::path::PathBuf,
    rel_path: std::path::PathBuf,
) -> YalcResult<FileDigest> {
    tokio::task::spawn_blocking(move || file_digest(&path, &rel_path))
        .await
        .map_err(|e| YalcError::Signature(format!("Digest task failed: {}", e)))?
}

/// Combine file digests into a package signature.
///
/// Input must be strictly ordered by relative path. Callers holding digests
/// in enumeration order use [`sorted_signature`].
pub fn package_signature(digests: &[FileDigest]) -> YalcResult<String> {
    if let Some(pair) = digests
        .windows(2)
        .find(|pair| pair[0].rel_path >= pair[1].rel_path)
    {
        return Err(YalcError::Signature(format!(
            "File digests out of order: '{}' before '{}'",
            pair[0].rel_path, pair[1].rel_path
        )));
    }

    let mut hasher = blake3::Hasher::new();
    for file in digests {
        hasher.update(file.digest.as_bytes());
    }
    Ok(truncated_hex(&hasher))
}

/// Sort by relative path, then sign.
pub fn sorted_signature(mut digests: Vec<FileDigest>) -> YalcResult<String> {
    digests.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    digests.dedup_by(|a, b| a.rel_path == b.rel_path);
    package_signature(&digests)
}

/// Version tag suffix: the first eight signature characters.
pub fn short_signature(signature: &str) -> &str {
    signature.get(..SHORT_SIGNATURE_LEN).unwrap_or(signature)
}

fn truncated_hex(hasher: &blake3::Hasher) -> String {
    let hash = hasher.finalize();
    hex::encode(&hash.as_bytes()[..DIGEST_BYTES])
}
