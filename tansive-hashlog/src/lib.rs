//! Hash-chained, Ed25519-signed append-only audit log.
//!
//! Every line is a JSON object carrying `payload`, `prevHash`, `hash`, and `signature`. The
//! writer side guarantees no partial writes between a `prevHash` and its `hash` (single mutex);
//! the verifier side streams the file, recomputing and re-checking each entry, and reports the
//! first failing line.

pub mod entry;
pub mod verifier;
pub mod writer;

pub use entry::HashedLogEntry;
pub use verifier::verify;
pub use writer::HashlogWriter;
