//! Content hashing
//!
//! SHA-256 based digests used for manifests and content ids:
//! - byte slices and streams of known size hash identically
//! - the digest is prefixed by the content length, so a truncated stream
//!   never collides with the full one
//! - trees are combined from path-sorted `(path, digest)` pairs, making the
//!   result independent of traversal order and of where the tree lives

use crate::error::{BeadError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 8 * 1024; // 8KB buffer

fn new_hasher(size: u64) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:", size).as_bytes());
    hasher
}

/// Hash a byte slice
///
/// # Example
///
/// ```
/// let digest = bead::storage::hash::hash_bytes(b"hello world");
/// assert_eq!(digest.len(), 64);
/// ```
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = new_hasher(data.len() as u64);
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash a stream of `size` bytes incrementally
///
/// Uses an 8KB buffer so large outputs are never loaded into memory.
///
/// # Errors
///
/// Returns an error if the stream can not be read or its length differs from
/// `size`.
pub fn hash_file<R: Read>(reader: R, size: u64) -> Result<String> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, reader);
    let mut hasher = new_hasher(size);
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        total += bytes_read as u64;
        hasher.update(&buffer[..bytes_read]);
    }

    if total != size {
        return Err(BeadError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("expected {} bytes, read {}", size, total),
        )));
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash a file on disk
pub fn hash_path(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    hash_file(file, size)
}

/// Combine per-file digests into a single tree digest
///
/// Entries are sorted by path before combination; only the relative paths
/// given here take part, never the location of the tree.
pub fn hash_tree<I, P, D>(entries: I) -> String
where
    I: IntoIterator<Item = (P, D)>,
    P: AsRef<str>,
    D: AsRef<str>,
{
    let mut entries: Vec<(String, String)> = entries
        .into_iter()
        .map(|(path, digest)| (path.as_ref().to_string(), digest.as_ref().to_string()))
        .collect();
    entries.sort();

    let mut listing = String::new();
    for (path, digest) in &entries {
        listing.push_str(&hash_bytes(path.as_bytes()));
        listing.push(' ');
        listing.push_str(digest);
        listing.push('\n');
    }
    hash_bytes(listing.as_bytes())
}
