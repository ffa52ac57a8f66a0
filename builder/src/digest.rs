//! SHA-256 digests of files on disk.

use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;

/// Compute the lowercase hex SHA-256 digest of the file at `path`.
///
/// The file is streamed in fixed-size chunks so large tool archives are
/// never held in memory.
///
/// # Errors
///
/// Returns any I/O error raised while opening or reading the file.
pub fn compute_sha256(path: &Utf8Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
