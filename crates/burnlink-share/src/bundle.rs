//! File bundling: many named files → one archive to encrypt
//!
//! The archive is the bincode encoding of a versioned file list:
//! ```text
//! Archive { version: u16, files: [BundledFile { name, content }] }
//! ```
//!
//! It is encrypted as a whole, so the format only has to restore exactly
//! what went in, in the same order. Identical inputs always produce
//! identical archives.

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Archive layout version written by [`bundle`]
pub const FORMAT_VERSION: u16 = 1;

/// Longest file name accepted, in bytes
pub const MAX_NAME_LEN: usize = 4096;

/// A named blob selected by the creator. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct BundledFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl BundledFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl std::fmt::Debug for BundledFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundledFile")
            .field("name", &self.name)
            .field("len", &self.content.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("file name too long: {0} bytes (limit {max})", max = MAX_NAME_LEN)]
    NameTooLong(usize),

    #[error("unsupported bundle version {0}")]
    UnsupportedVersion(u16),

    #[error("corrupt bundle: {0}")]
    Corrupt(String),

    #[error("encoding bundle: {0}")]
    Encode(String),
}

#[derive(Serialize)]
struct ArchiveRef<'a> {
    version: u16,
    files: &'a [BundledFile],
}

#[derive(Deserialize)]
struct Archive {
    version: u16,
    files: Vec<BundledFile>,
}

/// Fixed-width integers and no trailing garbage.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

fn check_names(files: &[BundledFile]) -> Result<(), BundleError> {
    match files.iter().find(|f| f.name.len() > MAX_NAME_LEN) {
        Some(file) => Err(BundleError::NameTooLong(file.name.len())),
        None => Ok(()),
    }
}

/// Pack `files` into one archive. Returns `None` for an empty selection.
pub fn bundle(files: &[BundledFile]) -> Result<Option<Zeroizing<Vec<u8>>>, BundleError> {
    if files.is_empty() {
        return Ok(None);
    }
    check_names(files)?;

    let archive = ArchiveRef {
        version: FORMAT_VERSION,
        files,
    };
    let encode_err = |e: bincode::Error| BundleError::Encode(e.to_string());

    // Sized up front so the plaintext is never left behind by a reallocation.
    let size = options().serialized_size(&archive).map_err(encode_err)?;
    let mut out = Zeroizing::new(Vec::with_capacity(size as usize));
    options().serialize_into(&mut *out, &archive).map_err(encode_err)?;

    tracing::debug!(files = files.len(), bytes = out.len(), "bundled files");
    Ok(Some(out))
}

/// Restore the files packed by [`bundle`], in their original order.
pub fn unbundle(archive: &[u8]) -> Result<Vec<BundledFile>, BundleError> {
    // Declared lengths can never exceed the archive itself.
    let decoded: Archive = options()
        .with_limit(archive.len() as u64)
        .deserialize(archive)
        .map_err(|e| BundleError::Corrupt(e.to_string()))?;

    if decoded.version != FORMAT_VERSION {
        return Err(BundleError::UnsupportedVersion(decoded.version));
    }
    check_names(&decoded.files)?;
    Ok(decoded.files)
}
