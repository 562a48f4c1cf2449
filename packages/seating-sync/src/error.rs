//! Structured error types for the seating engine.
//!
//! `SeatingError` is what every engine operation returns. `StoreError` is what
//! a [`TopologyStore`](crate::store::TopologyStore) adapter returns; the engine
//! wraps it without rewriting it so the caller sees the adapter's own failure.
//!
//! # Propagation
//!
//! Every error reaches the immediate caller. The engine never retries. The
//! only silent outcomes are the two designed no-ops: bootstrapping a missing
//! seating plan, and skipping a reconciliation pass because one is already
//! in flight. Neither is an error value.
//!
//! # Example
//!
//! ```ignore
//! match engine.sync_guest_to_seating(&guest_id, Some(&table_id)).await {
//!     Ok(seat) => println!("seated at {:?}", seat),
//!     Err(e) if e.category() == ErrorCategory::Capacity => {
//!         eprintln!("table is full, pick another one");
//!     }
//!     Err(e) if e.is_retryable() => eprintln!("try again: {}", e),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use std::fmt;

use thiserror::Error;

use crate::model::TableId;

// =============================================================================
// Error Category
// =============================================================================

/// How a UI layer should present a failure.
///
/// - `Capacity`: the target table has no free seat; ask for another table.
/// - `Retryable`: storage or batch failure; offer a retry.
/// - `NotFound`: a referenced template or document does not exist.
/// - `Validation`: malformed input (e.g. an inconsistent topology document).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Capacity,
    Retryable,
    NotFound,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Capacity => write!(f, "capacity"),
            ErrorCategory::Retryable => write!(f, "retryable"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::Validation => write!(f, "validation"),
        }
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// Errors from a topology store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The backend rejected or could not complete the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be encoded or decoded.
    #[error("serialization failed")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure in a file-backed store.
    #[error("io failure")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Seating Error
// =============================================================================

/// Error type for seating engine operations.
#[derive(Debug, Error)]
pub enum SeatingError {
    /// An adapter write failed. Carries the adapter error unmodified.
    #[error("store write failed")]
    StoreWrite(#[source] StoreError),

    /// An adapter read failed.
    #[error("store read failed")]
    StoreRead(#[source] StoreError),

    /// The target table has no unoccupied seat.
    #[error("table {table_id} has no free seat")]
    TableFull {
        /// The table that was asked for.
        table_id: TableId,
    },

    /// The guest corrections of a reconciliation pass failed to commit.
    ///
    /// The batch is all-or-nothing: none of the staged corrections applied.
    #[error("reconciliation batch of {staged} corrections failed")]
    ReconciliationBatch {
        /// Number of guest corrections that were staged.
        staged: usize,
        /// The adapter error returned by the batch commit.
        #[source]
        source: StoreError,
    },

    /// No layout template is registered under this id.
    #[error("unknown layout template: {0}")]
    UnknownTemplate(String),

    /// A topology document violates its structural rules.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

impl SeatingError {
    /// Presentation category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SeatingError::TableFull { .. } => ErrorCategory::Capacity,
            SeatingError::StoreWrite(StoreError::NotFound(_))
            | SeatingError::StoreRead(StoreError::NotFound(_))
            | SeatingError::UnknownTemplate(_) => ErrorCategory::NotFound,
            SeatingError::StoreWrite(_)
            | SeatingError::StoreRead(_)
            | SeatingError::ReconciliationBatch { .. } => ErrorCategory::Retryable,
            SeatingError::InvalidTopology(_) => ErrorCategory::Validation,
        }
    }

    /// Whether re-issuing the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Retryable
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SeatingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_full_display() {
        let err = SeatingError::TableFull {
            table_id: TableId::from("A"),
        };
        assert!(err.to_string().contains("table A"));
        assert_eq!(err.category(), ErrorCategory::Capacity);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_write_is_retryable() {
        let err = SeatingError::StoreWrite(StoreError::Unavailable("offline".into()));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "store write failed");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("store unavailable: offline"));
    }

    #[test]
    fn test_error_chain_names_adapter_message_once() {
        let err = anyhow::Error::new(SeatingError::StoreRead(StoreError::Unavailable(
            "offline".into(),
        )));
        let chain = format!("{:#}", err);
        assert_eq!(chain, "store read failed: store unavailable: offline");
        assert_eq!(chain.matches("offline").count(), 1);
    }

    #[test]
    fn test_missing_guest_is_not_found() {
        let err = SeatingError::StoreWrite(StoreError::NotFound("guests/g9".into()));
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_batch_error_keeps_source() {
        let err = SeatingError::ReconciliationBatch {
            staged: 3,
            source: StoreError::Unavailable("quota".into()),
        };
        assert!(err.is_retryable());
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("store unavailable: quota"));
        assert_eq!(err.to_string(), "reconciliation batch of 3 corrections failed");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Capacity.to_string(), "capacity");
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }
}
