//! Streaming hash-chain verification.

use ed25519_dalek::VerifyingKey;
use std::io::{BufRead, BufReader, Read};
use tansive_core::HashlogError;

use crate::entry::HashedLogEntry;

/// Scanner buffer sized to comfortably accept lines up to 1 MiB without repeated reallocation.
const LINE_BUFFER_HINT: usize = 1024 * 1024;

/// Verify every entry readable from `reader` against `public_key`.
///
/// Recomputes each entry's hash, checks it chains from the previous entry's hash, and verifies
/// the signature. Stops at the first failure, reporting the 1-based line number it occurred at.
pub fn verify<R: Read>(reader: R, public_key: &VerifyingKey) -> Result<usize, HashlogError> {
    let mut reader = BufReader::with_capacity(LINE_BUFFER_HINT, reader);
    let mut expected_prev = String::new();
    let mut count = 0usize;
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).map_err(|e| HashlogError::Io(e.to_string()))?;
        if bytes_read == 0 {
            break;
        }
        count += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            continue;
        }

        let entry: HashedLogEntry = serde_json::from_str(trimmed)
            .map_err(|e| HashlogError::MalformedEntry { line: count, reason: e.to_string() })?;

        if entry.prev_hash != expected_prev {
            return Err(HashlogError::ChainBroken {
                line: count,
                reason: format!("expected prevHash '{expected_prev}', found '{}'", entry.prev_hash),
            });
        }

        let recomputed = entry.recompute_hash();
        if recomputed != entry.hash {
            return Err(HashlogError::ChainBroken {
                line: count,
                reason: format!("hash mismatch: claimed '{}', recomputed '{recomputed}'", entry.hash),
            });
        }

        entry
            .verify_signature(public_key)
            .map_err(|_| HashlogError::SignatureInvalid { line: count })?;

        expected_prev = entry.hash;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::HashlogWriter;
    use rand::RngCore;
    use serde_json::json;
    use tempfile::tempdir;

    fn seeded_key() -> ([u8; 32], ed25519_dalek::SigningKey) {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        (seed, ed25519_dalek::SigningKey::from_bytes(&seed))
    }

    #[test]
    fn verifies_clean_chain_of_three_entries() {
        let dir = tempdir().unwrap();
        let (seed, signing_key) = seeded_key();
        let path = dir.path().join("log.jsonl");
        let writer = HashlogWriter::create(&path, &seed, 1).unwrap();
        for i in 0..3 {
            writer.add_entry(json!({"i": i})).unwrap();
        }
        writer.close().unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let n = verify(file, &signing_key.verifying_key()).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn flipped_hash_byte_fails_at_that_line() {
        let dir = tempdir().unwrap();
        let (seed, signing_key) = seeded_key();
        let path = dir.path().join("log.jsonl");
        let writer = HashlogWriter::create(&path, &seed, 1).unwrap();
        for i in 0..3 {
            writer.add_entry(json!({"i": i})).unwrap();
        }
        writer.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = content.lines().map(|s| s.to_string()).collect();
        let mut entry: HashedLogEntry = serde_json::from_str(&lines[1]).unwrap();
        let mut hash_bytes = hex::decode(&entry.hash).unwrap();
        hash_bytes[0] ^= 0xFF;
        entry.hash = hex::encode(hash_bytes);
        lines[1] = serde_json::to_string(&entry).unwrap();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let err = verify(file, &signing_key.verifying_key()).unwrap_err();
        match err {
            HashlogError::ChainBroken { line, .. } => assert_eq!(line, 2),
            other => panic!("expected ChainBroken at line 2, got {other:?}"),
        }
    }

    #[test]
    fn wrong_public_key_fails_signature_check() {
        let dir = tempdir().unwrap();
        let (seed, _signing_key) = seeded_key();
        let path = dir.path().join("log.jsonl");
        let writer = HashlogWriter::create(&path, &seed, 1).unwrap();
        writer.add_entry(json!({"i": 0})).unwrap();
        writer.close().unwrap();

        let (_other_seed, other_key) = seeded_key();
        let file = std::fs::File::open(&path).unwrap();
        let err = verify(file, &other_key.verifying_key()).unwrap_err();
        assert_eq!(err, HashlogError::SignatureInvalid { line: 1 });
    }
}
