//! The checksum-verifying downloader: stream a file in ~4 KiB blocks,
//! hash the raw bytes as they arrive, and only decode the buffer once the
//! digest and size are confirmed to match. Grounded on
//! `examples/original_source/apt/repo/abstractrepoobject.py`'s
//! `_download_file`, reusing the teacher's `sha256sum` streaming style
//! from `src/scan/mod.rs`.

use std::io::Read;

use digest::DynDigest;
use faster_hex::hex_string;
use log::warn;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::{Error, Result};
use crate::filehash::FileHash;

const BLOCK_SIZE: usize = 4096;

/// A transform applied to the verified, pre-decoded buffer: identity for a
/// plain file, gzip-decompression for a `Packages.gz` index, and so on.
pub type Decoder = dyn Fn(&[u8]) -> Result<Vec<u8>>;

fn hasher_for(algorithm: &str) -> Option<Box<dyn DynDigest>> {
    match algorithm {
        "sha256" => Some(Box::new(Sha256::new())),
        "sha512" => Some(Box::new(Sha512::new())),
        "sha1" => Some(Box::new(Sha1::new())),
        "md5" => Some(Box::new(Md5::new())),
        _ => None,
    }
}

/// Read `stream` to EOF, verify it against `hashes` using the strongest
/// populated algorithm, and return the decoded buffer. `decoder` is applied
/// once to the whole verified buffer, never per block (spec.md §4.E pins
/// the hash/size check to the pre-decoded bytes; this implementation
/// chooses to decode as a single pass rather than per-block, which is
/// simpler to get right for stateful decompressors).
pub fn download(mut stream: impl Read, hashes: &FileHash, decoder: Option<&Decoder>) -> Result<Vec<u8>> {
    let (algorithm, expected_digest) = hashes.best_hash().ok_or(Error::NoValidHash)?;
    let expected_digest = expected_digest.to_string();
    let expected_size = hashes.size.ok_or(Error::NoSize)?;

    let mut hasher = hasher_for(algorithm).ok_or(Error::NoValidHash)?;
    let mut buffer = Vec::new();
    let mut size: u64 = 0;
    let mut block = [0u8; BLOCK_SIZE];

    loop {
        let read = stream.read(&mut block)?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
        size += read as u64;
        buffer.extend_from_slice(&block[..read]);
    }

    let digest = hex_string(&hasher.finalize());
    if digest != expected_digest || size != expected_size {
        warn!(
            "checksum mismatch for {}: expected {} ({} bytes), got {} ({} bytes)",
            hashes.filename, expected_digest, expected_size, digest, size
        );
        return Err(Error::IncorrectChecksum(hashes.filename.clone()));
    }

    match decoder {
        Some(decoder) => decoder(&buffer),
        None => Ok(buffer),
    }
}

/// The identity decoder: returns the buffer unchanged.
pub fn identity(buffer: &[u8]) -> Result<Vec<u8>> {
    Ok(buffer.to_vec())
}

/// Decompress a gzip-compressed buffer, constructing a fresh decoder for
/// this call only.
pub fn gunzip(buffer: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::GzDecoder::new(buffer);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
