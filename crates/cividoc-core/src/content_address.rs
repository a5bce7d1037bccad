//! Content addressing: SHA-256 digests and derived storage keys.
//!
//! Objects are stored under a key derived from their content hash, which
//! gives deduplication for free. The two-character sharding prefix spreads
//! objects across storage partitions evenly; it carries no semantic meaning
//! and never participates in dedup (that uses the full digest).

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::AppError;

/// Compute the lowercase hex SHA-256 digest of a byte slice.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Compute the lowercase hex SHA-256 digest of an async reader.
///
/// The reader is consumed to EOF. A read failure mid-stream surfaces as
/// [`AppError::HashCalculation`]; the digest is never approximated.
pub async fn hash_reader<R>(mut reader: R) -> Result<String, AppError>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 8192];

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| AppError::HashCalculation(e.to_string()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Derive the storage key for a digest and original filename.
///
/// Format: `{first 2 hex chars}/{full digest}{lowercased extension}`.
/// A digest shorter than two characters falls back to the `"00"` prefix
/// segment; a filename without an extension yields a key without a suffix.
pub fn derive_storage_key(digest: &str, filename: &str) -> String {
    let prefix = if digest.len() >= 2 {
        &digest[..2]
    } else {
        "00"
    };

    match file_extension(filename) {
        Some(ext) => format!("{}/{}.{}", prefix, digest, ext),
        None => format!("{}/{}", prefix, digest),
    }
}

/// Lowercased extension of a filename, without the dot.
///
/// Returns `None` for filenames with no extension and for dotfiles like
/// `".gitignore"` whose only dot is the leading one.
pub fn file_extension(filename: &str) -> Option<String> {
    let idx = filename.rfind('.')?;
    if idx == 0 || idx == filename.len() - 1 {
        return None;
    }
    Some(filename[idx + 1..].to_lowercase())
}
