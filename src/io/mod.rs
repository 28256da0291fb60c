//! Pluggable IO Abstraction
//!
//! Loaders never touch the filesystem directly; they go through an
//! [`IoSystem`] installed on the dispatcher. This keeps format probing and
//! decoding usable against archives, in-memory file tables, or any other
//! byte source.
//!
//! - [`FileSystemIo`]: the default backend over the host filesystem
//! - [`MemoryIoSystem`]: an in-memory file table, used heavily by tests
//!
//! All reads are synchronous; every operation runs to completion on the
//! calling thread.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::errors::{ImportError, Result};

/// A readable, seekable byte stream with a known size.
pub trait ReadStream: Read + Seek {
    /// Total size of the stream in bytes.
    fn size(&self) -> u64;
}

/// Resolves paths to byte streams.
pub trait IoSystem {
    /// Returns true when `path` can be opened.
    fn exists(&self, path: &str) -> bool;

    /// Opens `path` for reading.
    fn open(&self, path: &str) -> Result<Box<dyn ReadStream>>;
}

// ============================================================================
// Filesystem backend
// ============================================================================

/// The default [`IoSystem`], backed by the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemIo;

struct FileStream {
    file: File,
    size: u64,
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

impl ReadStream for FileStream {
    fn size(&self) -> u64 {
        self.size
    }
}

impl IoSystem for FileSystemIo {
    fn exists(&self, path: &str) -> bool {
        !path.is_empty() && Path::new(path).is_file()
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadStream>> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Box::new(FileStream { file, size }))
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// An [`IoSystem`] over an in-memory file table.
///
/// Streams are cheap clones of the stored bytes, so the system stays usable
/// while streams are open.
#[derive(Debug, Default, Clone)]
pub struct MemoryIoSystem {
    files: FxHashMap<String, Vec<u8>>,
}

struct MemoryStream {
    cursor: Cursor<Vec<u8>>,
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl ReadStream for MemoryStream {
    fn size(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }
}

impl MemoryIoSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file under `path`.
    pub fn add_file(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl IoSystem for MemoryIoSystem {
    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn open(&self, path: &str) -> Result<Box<dyn ReadStream>> {
        let bytes = self
            .files
            .get(path)
            .ok_or_else(|| ImportError::MissingFile(path.to_string()))?;
        Ok(Box::new(MemoryStream {
            cursor: Cursor::new(bytes.clone()),
        }))
    }
}

// ============================================================================
// Stream helpers
// ============================================================================

/// Reads the whole stream into a byte vector.
pub fn read_to_end(stream: &mut dyn ReadStream) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(stream.size() as usize);
    stream.read_to_end(&mut out)?;
    Ok(out)
}

/// Reads at most `count` bytes from the front of the stream.
pub fn read_prefix(stream: &mut dyn ReadStream, count: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; count.min(stream.size() as usize)];
    stream.read_exact(&mut out)?;
    Ok(out)
}
