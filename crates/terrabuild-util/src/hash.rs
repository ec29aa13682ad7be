//! Lower-case hex digests.
//!
//! Generic over [`Digest`], so repository checksums (SHA-256, SHA-1, MD5)
//! and archive hashes go through the same code.

use std::io::Read;
use std::path::Path;

pub use sha2::Digest;
use sha2::Sha256;

/// Hex digest of `data`.
pub fn hex_digest<D: Digest>(data: &[u8]) -> String {
    to_hex(&D::digest(data))
}

/// Hex digest of everything `reader` yields, read in chunks.
pub fn hex_digest_reader<D: Digest>(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(to_hex(&hasher.finalize()))
}

/// SHA-256 of a file without loading it into memory.
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    hex_digest_reader::<Sha256>(std::fs::File::open(path)?)
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
