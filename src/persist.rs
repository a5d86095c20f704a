//! Raw single-blob persistence for finalised trees.
//!
//! A finalised tree is one contiguous buffer, so saving is a single write
//! and loading is a stat plus a copy into an exactly-sized allocation. No
//! parsing, no translation: the file stores host-order bytes and is only
//! portable between identical hosts.

use crate::error::Result;
use bytes::Bytes;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Load chunk size.
const READ_CHUNK: usize = 4096;

pub(crate) fn write_blob(path: &Path, buf: &[u8]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(buf)?;
    log::debug!("wrote {} bytes to {}", buf.len(), path.display());
    Ok(())
}

pub(crate) fn read_blob(path: &Path) -> Result<Bytes> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len() as usize;

    let mut buf = vec![0u8; len];
    for chunk in buf.chunks_mut(READ_CHUNK) {
        file.read_exact(chunk)?;
    }

    log::debug!("read {} bytes from {}", len, path.display());
    Ok(Bytes::from(buf))
}
