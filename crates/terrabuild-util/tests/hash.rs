use std::io::Write;
use std::path::Path;

use sha2::{Sha256, Sha512};
use terrabuild_util::hash::{file_sha256, hex_digest, hex_digest_reader};

const ARCHIVE_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

#[test]
fn test_hex_digest_is_lower_case_and_padded() {
    assert_eq!(hex_digest::<Sha256>(b"hello world"), ARCHIVE_SHA256);
    assert_eq!(hex_digest::<Sha512>(b"").len(), 128);
}

#[test]
fn test_reader_digest_crosses_chunk_boundaries() {
    // larger than one read buffer, and not a multiple of it
    let data: Vec<u8> = (0..200_003u32).map(|i| (i % 251) as u8).collect();
    let streamed = hex_digest_reader::<Sha256>(&data[..]).unwrap();
    assert_eq!(streamed, hex_digest::<Sha256>(&data));
}

#[test]
fn test_file_sha256_of_written_archive() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"hello world").unwrap();
    tmp.flush().unwrap();
    assert_eq!(file_sha256(tmp.path()).unwrap(), ARCHIVE_SHA256);
}

#[test]
fn test_file_sha256_missing_file() {
    let err = file_sha256(Path::new("/nonexistent/Terra-6.0.0.jar")).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}
