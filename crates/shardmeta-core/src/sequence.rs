//! Identifier sequence allocation.
//!
//! Sequences are drawn outside any directory transaction, so a value handed
//! out is never handed out again, even when the caller rolls back.

use crate::catalog::SequenceStore;
use crate::error::{DirectoryError, Result};
use tracing::{debug, trace};

/// Issue the next value of a named sequence.
///
/// Values are strictly increasing per sequence but not gap-free: values drawn
/// by a transaction that rolls back are skipped.
pub fn next_id<S: SequenceStore + ?Sized>(store: &S, sequence_name: &str) -> Result<u64> {
    let value = store
        .next_sequence_value(sequence_name)?
        .ok_or_else(|| DirectoryError::SequenceNotFound {
            name: sequence_name.to_string(),
        })?;
    trace!("Sequence {} issued {}", sequence_name, value);
    Ok(value)
}

/// Create a sequence whose first value is `start`; returns false if it exists.
pub fn create_sequence<S: SequenceStore + ?Sized>(
    store: &S,
    sequence_name: &str,
    start: u64,
) -> Result<bool> {
    let created = store.create_sequence(sequence_name, start)?;
    if created {
        debug!("Created sequence {} starting at {}", sequence_name, start);
    }
    Ok(created)
}
