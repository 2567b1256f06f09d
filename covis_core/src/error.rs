use thiserror::Error;

use crate::RecordId;

/// Typed faults raised by a usage store.
///
/// Absence of history is not a fault: lookups for unknown sessions, records
/// or queries return empty results. Only operations that require an existing
/// row, such as deactivating a record, report an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not present: {0}")]
    RecordNotPresent(RecordId),
}
