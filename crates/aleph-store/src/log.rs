use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aleph_types::Statement;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SyncMode;
use crate::error::{StoreError, StoreResult};

/// A single durable mutation of the statement store.
///
/// On-disk format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    Put(Statement),
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Records read back from the log on open.
#[derive(Debug, Default)]
pub struct Recovered {
    pub records: Vec<LogRecord>,
    /// Byte offset just past the last intact record.
    pub end_offset: u64,
    /// Records dropped because their CRC or payload did not check out.
    pub skipped: usize,
}

struct LogWriter {
    file: File,
    /// Current end of the log.
    offset: u64,
}

/// Append-only, crash-recoverable statement log.
///
/// Each record is framed with a length prefix and a CRC32 checksum and
/// written with a single `write_all`. A failed append is rolled back by
/// truncating to the previous end, so a later append never lands behind a
/// partial record.
pub struct StatementLog {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    sync_mode: SyncMode,
}

impl StatementLog {
    /// Open (or create) the log at `path`.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let offset = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter { file, offset }),
            sync_mode,
        })
    }

    /// Append a record. Returns the byte offset it was written at.
    pub fn append(&self, record: &LogRecord) -> StoreResult<u64> {
        let frame = encode_frame(record)?;

        let mut w = self.lock_writer()?;
        let entry_offset = w.offset;

        if let Err(e) = write_frame(&mut w.file, &frame, self.sync_mode) {
            warn!(offset = entry_offset, error = %e, "log append failed; rolling back");
            if let Err(rollback) = w.file.set_len(entry_offset) {
                warn!(offset = entry_offset, error = %rollback, "log rollback failed");
            }
            return Err(e.into());
        }

        w.offset += frame.len() as u64;
        debug!(offset = entry_offset, len = frame.len(), "log append");
        Ok(entry_offset)
    }

    /// Read every intact record front-to-back.
    ///
    /// Records failing the CRC check or decoding are logged and skipped. A
    /// torn tail ends recovery; `end_offset` then marks where it starts.
    pub fn recover(&self) -> StoreResult<Recovered> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut recovered = Recovered::default();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
                warn!(offset, length, file_len, "invalid log record length; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "truncated log record; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let next = offset + HEADER_SIZE as u64 + length as u64;
            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(offset, expected = expected_crc, actual = actual_crc, "CRC mismatch; skipping record");
                recovered.skipped += 1;
                offset = next;
                recovered.end_offset = offset;
                continue;
            }

            match bincode::deserialize::<LogRecord>(&payload) {
                Ok(record) => recovered.records.push(record),
                Err(e) => {
                    warn!(offset, error = %e, "failed to decode log record; skipping");
                    recovered.skipped += 1;
                }
            }
            offset = next;
            recovered.end_offset = offset;
        }

        debug!(
            recovered = recovered.records.len(),
            skipped = recovered.skipped,
            "log recovery complete"
        );
        Ok(recovered)
    }

    /// Cut the log back to `offset`, discarding a torn tail.
    pub fn truncate_to(&self, offset: u64) -> StoreResult<()> {
        let mut w = self.lock_writer()?;
        if offset < w.offset {
            w.file.set_len(offset)?;
            w.file.sync_all()?;
            warn!(from = w.offset, to = offset, "truncated log tail");
            w.offset = offset;
        }
        Ok(())
    }

    /// Replace the whole log with `records`.
    ///
    /// The new log is written to a temporary file beside the old one and
    /// renamed over it, so a crash leaves either the old or the new log.
    pub fn rewrite(&self, records: &[LogRecord]) -> StoreResult<()> {
        let mut w = self.lock_writer()?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        let mut written: u64 = 0;
        for record in records {
            let frame = encode_frame(record)?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        w.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        w.offset = written;

        debug!(records = records.len(), bytes = written, "log rewritten");
        Ok(())
    }

    /// Flush file contents to disk.
    pub fn sync(&self) -> StoreResult<()> {
        self.lock_writer()?.file.sync_all()?;
        Ok(())
    }

    /// Current end of the log in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock_writer()?.offset)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_writer(&self) -> StoreResult<std::sync::MutexGuard<'_, LogWriter>> {
        self.writer
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("statement log: {e}")))
    }
}

impl std::fmt::Debug for StatementLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementLog")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

fn write_frame(file: &mut File, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
    file.write_all(frame)?;
    if sync_mode == SyncMode::EveryWrite {
        file.sync_data()?;
    }
    Ok(())
}

fn encode_frame(record: &LogRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
