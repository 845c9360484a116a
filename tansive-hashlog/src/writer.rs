//! Append-only hash-chained log writer.
//!
//! One mutex guards the buffer and the running chain head so `prevHash`/`hash` updates are never
//! interleaved between concurrent `add_entry` callers. Flush happens when the buffer reaches the
//! configured interval or on an explicit `flush()`/`close()`.

use ed25519_dalek::SigningKey;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tansive_core::HashlogError;

use crate::entry::HashedLogEntry;

const ED25519_SECRET_KEY_LEN: usize = 32;

struct WriterState {
    file: Option<BufWriter<File>>,
    prev_hash: String,
    buffered: usize,
    closed: bool,
}

/// Hash-chained, Ed25519-signed append-only log writer.
pub struct HashlogWriter {
    path: PathBuf,
    signing_key: SigningKey,
    flush_every: usize,
    state: Mutex<WriterState>,
}

impl HashlogWriter {
    /// Open (creating if absent) the log file at `path` for appending.
    ///
    /// `private_key_bytes` must be exactly 32 bytes (the Ed25519 seed); any other length is
    /// rejected at construction rather than deferred to the first sign call.
    pub fn create(path: impl Into<PathBuf>, private_key_bytes: &[u8], flush_every: usize) -> Result<Self, HashlogError> {
        if private_key_bytes.len() != ED25519_SECRET_KEY_LEN {
            return Err(HashlogError::InvalidPrivateKeyLength {
                expected: ED25519_SECRET_KEY_LEN,
                got: private_key_bytes.len(),
            });
        }
        let mut seed = [0u8; ED25519_SECRET_KEY_LEN];
        seed.copy_from_slice(private_key_bytes);
        let signing_key = SigningKey::from_bytes(&seed);

        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HashlogError::Io(e.to_string()))?;

        Ok(Self {
            path,
            signing_key,
            flush_every: flush_every.max(1),
            state: Mutex::new(WriterState {
                file: Some(BufWriter::new(file)),
                prev_hash: String::new(),
                buffered: 0,
                closed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn verification_public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Seal and append a new entry. Fails if the writer has been closed.
    pub fn add_entry(&self, payload: Value) -> Result<HashedLogEntry, HashlogError> {
        let mut state = self.state.lock().expect("hashlog writer mutex poisoned");
        if state.closed {
            return Err(HashlogError::WriterClosed);
        }

        let entry = HashedLogEntry::seal(payload, &state.prev_hash, &self.signing_key);
        let line = serde_json::to_string(&entry).map_err(|e| HashlogError::Io(e.to_string()))?;

        let file = state.file.as_mut().expect("file present while not closed");
        writeln!(file, "{line}").map_err(|e| HashlogError::Io(e.to_string()))?;

        state.prev_hash = entry.hash.clone();
        state.buffered += 1;
        if state.buffered >= self.flush_every {
            file.flush().map_err(|e| HashlogError::Io(e.to_string()))?;
            state.buffered = 0;
        }

        Ok(entry)
    }

    /// Explicitly flush any buffered entries to disk.
    pub fn flush(&self) -> Result<(), HashlogError> {
        let mut state = self.state.lock().expect("hashlog writer mutex poisoned");
        if let Some(file) = state.file.as_mut() {
            file.flush().map_err(|e| HashlogError::Io(e.to_string()))?;
        }
        state.buffered = 0;
        Ok(())
    }

    /// Flush and close the underlying file. Idempotent: closing an already-closed writer
    /// succeeds without error.
    pub fn close(&self) -> Result<(), HashlogError> {
        let mut state = self.state.lock().expect("hashlog writer mutex poisoned");
        if state.closed {
            return Ok(());
        }
        if let Some(mut file) = state.file.take() {
            file.flush().map_err(|e| HashlogError::Io(e.to_string()))?;
        }
        state.closed = true;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("hashlog writer mutex poisoned").closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn seed() -> [u8; 32] {
        use rand::RngCore;
        let mut s = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut s);
        s
    }

    #[test]
    fn first_entry_has_empty_prev_hash() {
        let dir = tempdir().unwrap();
        let writer = HashlogWriter::create(dir.path().join("log.jsonl"), &seed(), 1).unwrap();
        let entry = writer.add_entry(json!({"i": 0})).unwrap();
        assert_eq!(entry.prev_hash, "");
    }

    #[test]
    fn subsequent_entries_chain_prev_hash() {
        let dir = tempdir().unwrap();
        let writer = HashlogWriter::create(dir.path().join("log.jsonl"), &seed(), 1).unwrap();
        let first = writer.add_entry(json!({"i": 0})).unwrap();
        let second = writer.add_entry(json!({"i": 1})).unwrap();
        assert_eq!(second.prev_hash, first.hash);
    }

    #[test]
    fn closed_writer_rejects_further_entries() {
        let dir = tempdir().unwrap();
        let writer = HashlogWriter::create(dir.path().join("log.jsonl"), &seed(), 1).unwrap();
        writer.close().unwrap();
        assert_eq!(writer.add_entry(json!({"i": 0})).unwrap_err(), HashlogError::WriterClosed);
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempdir().unwrap();
        let writer = HashlogWriter::create(dir.path().join("log.jsonl"), &seed(), 1).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn wrong_length_private_key_is_rejected_at_construction() {
        let dir = tempdir().unwrap();
        let err = HashlogWriter::create(dir.path().join("log.jsonl"), &[0u8; 16], 1).unwrap_err();
        assert_eq!(err, HashlogError::InvalidPrivateKeyLength { expected: 32, got: 16 });
    }
}
