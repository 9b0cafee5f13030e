//! Group-committing durable log writer.
//!
//! Invariants enforced here:
//!
//! - No `push` returns success before the force covering its record has
//!   completed.
//! - Exactly one background thread (`durlog-sync`) touches the storage
//!   handle; file position is a single-threaded concern.
//! - Every batch is sorted by `(producer_id, sequence)` before
//!   serialization, so a producer's records appear in the file in
//!   submission order regardless of dequeue interleaving.
//! - Background failures never unwind across threads: they resolve the
//!   affected completions and, during the final drain, surface from
//!   `close()`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::crash_point::{maybe_crash, points};
use crate::observability::{Logger, StatsSnapshot, WriterMetrics};

use super::batch::Batch;
use super::config::WriterConfig;
use super::errors::{LogError, LogResult};
use super::format::{FileHeader, FILE_HEADER_SIZE};
use super::queue::IntakeQueue;
use super::request::WriteRequest;
use super::sequence::SequenceTable;
use super::storage::{FileStorage, LogStorage};

/// How long `close` waits for the sync thread to drain and exit.
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Thread-safe durable log writer.
///
/// Producers call [`LogWriter::push`] from any number of threads; each call
/// blocks until the record is on stable storage. Batching amortizes the
/// force cost across concurrent pushes.
pub struct LogWriter {
    config: WriterConfig,
    queue: Arc<IntakeQueue>,
    sequences: SequenceTable,
    metrics: Arc<WriterMetrics>,
    drain_error: Arc<Mutex<Option<LogError>>>,
    sync_thread: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("path", &self.path)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl LogWriter {
    /// Opens or creates a log file and starts the sync thread.
    ///
    /// A new file gets its header written and fully forced before `open`
    /// returns; an existing file has its header verified and is appended
    /// to at end-of-file.
    pub fn open(path: impl AsRef<Path>, config: WriterConfig) -> LogResult<Self> {
        let path = path.as_ref();
        config.validate()?;
        let storage = FileStorage::open(path).map_err(|e| LogError::io("open", &e))?;
        let writer = Self::start(Box::new(storage), config, Some(path.to_path_buf()))?;
        Logger::info("WRITER_OPEN", &[("path", &path.display().to_string())]);
        Ok(writer)
    }

    /// Starts a writer over an arbitrary storage backend. Tests use this to
    /// inject delaying or failing force implementations.
    pub fn with_storage(storage: Box<dyn LogStorage>, config: WriterConfig) -> LogResult<Self> {
        config.validate()?;
        Self::start(storage, config, None)
    }

    fn start(
        mut storage: Box<dyn LogStorage>,
        config: WriterConfig,
        path: Option<PathBuf>,
    ) -> LogResult<Self> {
        Self::prepare_header(storage.as_mut())?;

        let queue = Arc::new(IntakeQueue::new(config.max_queue_size));
        let metrics = Arc::new(WriterMetrics::new());
        let drain_error = Arc::new(Mutex::new(None));

        let sync_loop = SyncLoop {
            queue: queue.clone(),
            storage,
            config: config.clone(),
            metrics: metrics.clone(),
            drain_error: drain_error.clone(),
        };
        let handle = thread::Builder::new()
            .name("durlog-sync".into())
            .spawn(move || sync_loop.run())
            .map_err(|e| LogError::io("spawn sync thread", &e))?;

        Ok(Self {
            config,
            queue,
            sequences: SequenceTable::new(),
            metrics,
            drain_error,
            sync_thread: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
            path,
        })
    }

    /// Writes the header into an empty store, or verifies the one already
    /// present. The header write is always a full force so the file
    /// skeleton survives a crash regardless of `sync_metadata`.
    fn prepare_header(storage: &mut dyn LogStorage) -> LogResult<()> {
        let size = storage.size().map_err(|e| LogError::io("stat", &e))?;
        if size == 0 {
            let header = FileHeader::new();
            storage
                .append(&header.encode())
                .map_err(|e| LogError::io("write header", &e))?;
            storage.sync().map_err(|e| LogError::io("force header", &e))?;
            return Ok(());
        }
        if size < FILE_HEADER_SIZE as u64 {
            return Err(LogError::corruption(
                0,
                format!("existing file too small for header: {size} bytes"),
            ));
        }
        let bytes = storage
            .read_at(0, FILE_HEADER_SIZE)
            .map_err(|e| LogError::io("read header", &e))?;
        FileHeader::decode(&bytes)?;
        Ok(())
    }

    /// Appends one record and blocks until it is durable.
    ///
    /// Fails synchronously with `RecordTooLarge` or `Closed`; fails after
    /// blocking with the propagated I/O error if the batch containing the
    /// record could not be committed.
    pub fn push(&self, payload: &[u8]) -> LogResult<()> {
        if payload.len() > self.config.max_record_size_bytes {
            return Err(LogError::RecordTooLarge {
                actual: payload.len(),
                limit: self.config.max_record_size_bytes,
            });
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(LogError::Closed);
        }

        let id = self.sequences.next_for_current_thread();
        let request = Arc::new(WriteRequest::new(payload.to_vec(), id));
        self.queue.submit(request.clone())?;

        match request.completion().wait() {
            Ok(()) => Ok(()),
            Err(error) => {
                // Failed work stays counted against admission until its
                // caller has observed the failure; that observation is now.
                self.queue.release_permits(1);
                Err(error)
            }
        }
    }

    /// Counters for this writer. All values reflect durable work only.
    pub fn stats(&self) -> StatsSnapshot {
        self.metrics.snapshot()
    }

    /// The file path, if this writer was opened over a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stops admission, drains all queued requests through a final flush,
    /// and joins the sync thread (bounded). Idempotent: a second `close`
    /// returns `Ok(())` without effect.
    ///
    /// Returns the I/O error if the final drain failed to commit.
    pub fn close(&self) -> LogResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.queue.close();

        let handle = self.sync_thread.lock().unwrap().take();
        if let Some(handle) = handle {
            let deadline = Instant::now() + SHUTDOWN_JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_POLL_INTERVAL);
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                Logger::error("SYNC_THREAD_JOIN_TIMEOUT", &[]);
            }
        }

        // Anything the sync thread never reached fails as closed.
        for request in self.queue.take_remaining() {
            request.completion().resolve_err(LogError::Closed);
        }

        let drain_error = self.drain_error.lock().unwrap().take();
        if let Some(path) = &self.path {
            Logger::info("WRITER_CLOSED", &[("path", &path.display().to_string())]);
        }
        match drain_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// State owned by the sync thread: collects batches, commits them, resolves
/// waiters. Exclusive owner of the storage handle.
struct SyncLoop {
    queue: Arc<IntakeQueue>,
    storage: Box<dyn LogStorage>,
    config: WriterConfig,
    metrics: Arc<WriterMetrics>,
    drain_error: Arc<Mutex<Option<LogError>>>,
}

impl SyncLoop {
    fn run(mut self) {
        let mut batch = Batch::new();
        let mut buffer = Vec::with_capacity(self.config.max_batch_size_bytes.min(4 * 1024 * 1024));

        loop {
            if !self.queue.wait_for_work() {
                // Closed with nothing pending.
                break;
            }

            batch.clear();
            self.collect(&mut batch);
            if batch.is_empty() {
                if self.queue.is_drained() {
                    break;
                }
                continue;
            }

            batch.sort_for_commit();
            match self.commit(&batch, &mut buffer) {
                Ok(()) => {
                    // Durable: acknowledge, then reopen admission.
                    batch.complete_all_ok();
                    self.queue.release_permits(batch.len());
                    self.metrics
                        .record_batch(batch.len() as u64, batch.frame_bytes() as u64);
                }
                Err(error) => {
                    Logger::error(
                        "BATCH_COMMIT_FAILED",
                        &[
                            ("code", error.code()),
                            ("message", &error.to_string()),
                            ("records", &batch.len().to_string()),
                        ],
                    );
                    batch.complete_all_err(&error);
                    if self.queue.is_closed() {
                        // Failure during the final drain surfaces from close().
                        *self.drain_error.lock().unwrap() = Some(error);
                        break;
                    }
                }
            }
        }
    }

    /// Accumulates one batch: drain everything available, then flush when
    /// the size or time trigger fires. The first request of a batch is
    /// waited for indefinitely; a batch is never flushed empty.
    fn collect(&self, batch: &mut Batch) {
        let deadline =
            Instant::now() + Duration::from_millis(self.config.max_batch_wait_millis);
        loop {
            self.queue
                .drain_available(batch, self.config.max_batch_size_bytes);
            if self.should_flush(batch, deadline) {
                return;
            }
            if self.queue.is_drained() {
                // Shutdown: flush whatever was collected without waiting
                // out the time budget.
                return;
            }
            if !self.queue.wait_for_more(batch.is_empty(), deadline) {
                return;
            }
        }
    }

    fn should_flush(&self, batch: &Batch, deadline: Instant) -> bool {
        !batch.is_empty()
            && (batch.frame_bytes() >= self.config.max_batch_size_bytes
                || Instant::now() >= deadline)
    }

    /// Serializes and persists one batch. Nothing before the force makes
    /// the batch durable; callers must not acknowledge on `Err`.
    fn commit(&mut self, batch: &Batch, buffer: &mut Vec<u8>) -> LogResult<()> {
        batch.encode_into(buffer);

        maybe_crash(points::LOG_BEFORE_WRITE);
        self.storage
            .append(buffer)
            .map_err(|e| LogError::io("batch write", &e))?;

        maybe_crash(points::LOG_BEFORE_FORCE);
        let force = if self.config.sync_metadata {
            self.storage.sync()
        } else {
            self.storage.flush()
        };
        force.map_err(|e| LogError::io("force", &e))?;
        maybe_crash(points::LOG_AFTER_FORCE);

        Ok(())
    }
}
