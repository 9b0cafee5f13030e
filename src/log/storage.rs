//! Storage backends for the log file.
//!
//! Backends are opaque byte stores: the writer owns all format
//! interpretation, a backend only appends, forces, and reads back bytes.
//! `flush` makes previously appended data durable; `sync` additionally
//! forces file metadata (size, timestamps).
//!
//! [`FileStorage`] is the production backend. [`MemoryStorage`] backs unit
//! tests and lets fault-injection tests observe or wrap the force path.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A low-level byte store for one log file.
pub trait LogStorage: Send {
    /// Appends `data` at the end of the store.
    fn append(&mut self, data: &[u8]) -> io::Result<()>;

    /// Forces previously appended data to stable storage.
    fn flush(&mut self) -> io::Result<()>;

    /// Forces data and file metadata to stable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Current size of the store in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Reads exactly `len` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>>;
}

/// File-backed storage opened for append.
#[derive(Debug)]
pub struct FileStorage {
    file: File,
}

impl FileStorage {
    /// Opens or creates the file at `path`. Writes always land at the end
    /// of the file regardless of read positioning.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl LogStorage for FileStorage {
    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: Vec<u8>,
    flushes: u64,
    syncs: u64,
}

/// In-memory storage with force-call accounting, for tests.
///
/// Clones share the same buffer, so a test can keep a handle while the
/// writer owns the boxed backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored bytes.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().unwrap().data.clone()
    }

    /// Number of data-only forces performed.
    pub fn flush_count(&self) -> u64 {
        self.inner.lock().unwrap().flushes
    }

    /// Number of full forces performed.
    pub fn sync_count(&self) -> u64 {
        self.inner.lock().unwrap().syncs
    }

    /// Total forces of either kind.
    pub fn force_count(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner.flushes + inner.syncs
    }
}

impl LogStorage for MemoryStorage {
    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.lock().unwrap().data.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap().flushes += 1;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap().syncs += 1;
        Ok(())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.inner.lock().unwrap().data.len() as u64)
    }

    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "read range overflows"))?;
        if end > inner.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read of {} bytes at offset {} exceeds size {}",
                    len,
                    offset,
                    inner.data.len()
                ),
            ));
        }
        Ok(inner.data[start..end].to_vec())
    }
}
