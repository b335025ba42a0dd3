//! Content fingerprinting using BLAKE3

use crate::error::FingerprintError;
use crate::types::Fingerprint;
use blake3::Hasher;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Default read size for streaming a file through the hasher
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the fingerprint of a file, streaming it in `CHUNK_SIZE` reads
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, FingerprintError> {
    fingerprint_file_chunked(path, CHUNK_SIZE)
}

/// Compute the fingerprint of a file using a caller-chosen chunk size
///
/// Memory use is bounded by `chunk_size` regardless of the file's length.
/// Any open or read failure is returned as-is; the caller decides how to
/// treat the file.
pub fn fingerprint_file_chunked(
    path: &Path,
    chunk_size: usize,
) -> Result<Fingerprint, FingerprintError> {
    let wrap = |source| FingerprintError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(wrap)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(wrap(e)),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Compute the fingerprint of an in-memory byte slice
pub fn compute_content_hash(content: &[u8]) -> Fingerprint {
    let mut hasher = Hasher::new();
    hasher.update(content);
    *hasher.finalize().as_bytes()
}
