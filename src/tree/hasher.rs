//! Content digests using BLAKE3

use blake3::Hasher;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Width of the digest suffix carried on `mc4:` report lines, without the separator
pub const REPORT_DIGEST_LEN: usize = 32;

/// Stream a file through BLAKE3 and return the full hex digest
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Fixed-width digest used in provenance reports.
///
/// Missing or unreadable files digest to all zeros; the suffix is informational only.
pub fn report_digest(path: &Path) -> String {
    match hash_file(path) {
        Ok(full) => full[..REPORT_DIGEST_LEN].to_string(),
        Err(_) => "0".repeat(REPORT_DIGEST_LEN),
    }
}
