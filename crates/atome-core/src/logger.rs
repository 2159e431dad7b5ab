//! Diagnostic logger: raw PCM capture of rendered audio.
//!
//! While enabled, every render call appends its samples to a flat file of
//! little-endian 32-bit floats (no header, no framing). One file per session,
//! named `audio_log_YYYY-MM-DD_HH-MM-SS.raw` after the local time the session
//! was opened.
//!
//! # Real-Time Safety
//!
//! The render thread never touches the file. It pushes samples into a
//! bounded single-producer/single-consumer queue ([`rtrb`]) that a background
//! writer thread drains to disk:
//!
//! - The session is reached through `try_lock`; if the control thread is
//!   swapping sessions at that instant, the buffer is dropped and counted
//! - A buffer that does not fit in the queue as a whole is dropped and
//!   counted, so the file never contains a partial render call
//! - Pushing writes into memory reserved when the session was opened
//!
//! Enabling while a session is open closes the old file first, so sessions
//! never interleave.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::buffer::AudioBuffer;
use crate::config::LogLayout;
use crate::error::LoggerError;

/// Poll period of the writer thread when the queue is empty.
const WRITER_IDLE: Duration = Duration::from_millis(2);

/// Give up on unique file names after this many collisions.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Outcome of a closed logging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSummary {
    /// File the session wrote to.
    pub path: PathBuf,
    /// Bytes that reached the file.
    pub bytes_written: u64,
    /// Failed writes (samples in a failed write are lost).
    pub write_errors: u64,
    /// Render buffers dropped during the session.
    pub buffers_dropped: u64,
}

struct WriterOutcome {
    bytes_written: u64,
    write_errors: u64,
}

struct Session {
    path: PathBuf,
    thread: JoinHandle<WriterOutcome>,
    dropped_at_open: u64,
}

/// Capture sink shared between the render thread and the control thread.
pub struct DiagnosticLogger {
    directory: PathBuf,
    layout: LogLayout,
    capacity: usize,
    /// Render-thread side of the open session.
    producer: Mutex<Option<Producer<f32>>>,
    /// Control-thread side. Held for the whole of enable/disable.
    session: Mutex<Option<Session>>,
    enabled: AtomicBool,
    buffers_dropped: AtomicU64,
    write_errors: Arc<AtomicU64>,
}

impl DiagnosticLogger {
    /// Create a disabled logger.
    ///
    /// # Arguments
    ///
    /// * `directory` - Host-writable directory for log files
    /// * `layout` - Sample order within each render call
    /// * `capacity` - Queue length in samples
    pub fn new(directory: impl AsRef<Path>, layout: LogLayout, capacity: usize) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            layout,
            capacity: capacity.max(1),
            producer: Mutex::new(None),
            session: Mutex::new(None),
            enabled: AtomicBool::new(false),
            buffers_dropped: AtomicU64::new(0),
            write_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a session is open.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Path of the open session's file.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.session.lock().as_ref().map(|s| s.path.clone())
    }

    /// Render buffers dropped since construction.
    pub fn buffers_dropped(&self) -> u64 {
        self.buffers_dropped.load(Ordering::Relaxed)
    }

    /// Failed file writes since construction.
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Control thread
    // =========================================================================

    /// Open a new session, closing any open one first.
    ///
    /// Returns the new file's path.
    pub fn enable(&self) -> Result<PathBuf, LoggerError> {
        let mut session = self.session.lock();
        if let Some(previous) = session.take() {
            let summary = self.close(previous)?;
            log::info!(
                "closed diagnostic log {} ({} bytes) before reopening",
                summary.path.display(),
                summary.bytes_written
            );
        }

        let (path, file) = create_log_file(&self.directory)?;
        let (producer, consumer) = RingBuffer::<f32>::new(self.capacity);

        let write_errors = Arc::clone(&self.write_errors);
        let thread = thread::Builder::new()
            .name("atome-log-writer".into())
            .spawn(move || drain(consumer, file, write_errors))
            .map_err(LoggerError::Spawn)?;

        *self.producer.lock() = Some(producer);
        self.enabled.store(true, Ordering::Release);
        *session = Some(Session {
            path: path.clone(),
            thread,
            dropped_at_open: self.buffers_dropped(),
        });

        log::info!("diagnostic logging to {}", path.display());
        Ok(path)
    }

    /// Close the open session, flushing everything queued so far.
    ///
    /// Returns `None` if logging was not enabled.
    pub fn disable(&self) -> Result<Option<LogSummary>, LoggerError> {
        let mut session = self.session.lock();
        match session.take() {
            Some(open) => {
                let summary = self.close(open)?;
                log::info!(
                    "diagnostic log {} closed ({} bytes, {} buffers dropped)",
                    summary.path.display(),
                    summary.bytes_written,
                    summary.buffers_dropped
                );
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }

    fn close(&self, session: Session) -> Result<LogSummary, LoggerError> {
        self.enabled.store(false, Ordering::Release);
        // Dropping the producer abandons the queue; the writer drains what is
        // left and exits.
        self.producer.lock().take();

        let outcome = session
            .thread
            .join()
            .map_err(|_| LoggerError::WriterPanicked(session.path.clone()))?;

        Ok(LogSummary {
            path: session.path,
            bytes_written: outcome.bytes_written,
            write_errors: outcome.write_errors,
            buffers_dropped: self.buffers_dropped() - session.dropped_at_open,
        })
    }

    // =========================================================================
    // Render thread
    // =========================================================================

    /// Queue one render call's samples. Never blocks or allocates.
    ///
    /// Returns `false` if the buffer was dropped.
    pub fn append(&self, buffer: &AudioBuffer<'_, '_>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(mut guard) = self.producer.try_lock() else {
            self.buffers_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        let Some(producer) = guard.as_mut() else {
            return false;
        };

        let frames = buffer.frames();
        let channels = buffer.channel_count();
        let total = frames * channels;
        if total == 0 {
            return true;
        }
        if producer.slots() < total {
            self.buffers_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let Ok(chunk) = producer.write_chunk_uninit(total) else {
            self.buffers_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let written = match self.layout {
            LogLayout::PerChannelBlocks => {
                let samples = (0..channels)
                    .flat_map(move |c| buffer.channel(c).unwrap_or_default().iter().copied());
                chunk.fill_from_iter(samples)
            }
            LogLayout::Interleaved => {
                let samples = (0..frames).flat_map(move |i| {
                    (0..channels).map(move |c| buffer.channel(c).map_or(0.0, |ch| ch[i]))
                });
                chunk.fill_from_iter(samples)
            }
        };
        debug_assert_eq!(written, total);
        true
    }
}

impl Drop for DiagnosticLogger {
    fn drop(&mut self) {
        if let Err(err) = self.disable() {
            log::warn!("failed to close diagnostic log: {}", err);
        }
    }
}

/// Create `audio_log_<timestamp>.raw`, adding `_N` if the name is taken.
fn create_log_file(directory: &Path) -> Result<(PathBuf, File), LoggerError> {
    let stem = format!(
        "audio_log_{}",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.raw")
        } else {
            format!("{stem}_{attempt}.raw")
        };
        let path = directory.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(LoggerError::Io { path, source }),
        }
    }

    Err(LoggerError::Io {
        path: directory.join(format!("{stem}.raw")),
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free log file name"),
    })
}

/// Writer thread body: drain the queue until the producer is gone and the
/// queue is empty.
fn drain(mut consumer: Consumer<f32>, file: File, write_errors: Arc<AtomicU64>) -> WriterOutcome {
    let mut writer = BufWriter::new(file);
    let mut outcome = WriterOutcome {
        bytes_written: 0,
        write_errors: 0,
    };

    loop {
        // Check abandonment before reading slots: once abandoned, no more
        // samples can arrive after this read.
        let abandoned = consumer.is_abandoned();
        let available = consumer.slots();

        if available > 0 {
            if let Ok(chunk) = consumer.read_chunk(available) {
                let (first, second) = chunk.as_slices();
                for slice in [first, second] {
                    match write_samples(&mut writer, slice) {
                        Ok(bytes) => outcome.bytes_written += bytes,
                        Err(err) => {
                            outcome.write_errors += 1;
                            write_errors.fetch_add(1, Ordering::Relaxed);
                            log::warn!("diagnostic log write failed: {}", err);
                        }
                    }
                }
                chunk.commit_all();
            }
            continue;
        }

        if abandoned {
            break;
        }
        thread::sleep(WRITER_IDLE);
    }

    if let Err(err) = writer.flush() {
        outcome.write_errors += 1;
        write_errors.fetch_add(1, Ordering::Relaxed);
        log::warn!("diagnostic log flush failed: {}", err);
    }
    outcome
}

fn write_samples(writer: &mut impl Write, samples: &[f32]) -> io::Result<u64> {
    for sample in samples {
        writer.write_all(&sample.to_le_bytes())?;
    }
    Ok(samples.len() as u64 * 4)
}
