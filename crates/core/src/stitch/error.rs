use thiserror::Error;

use crate::storage::RepositoryError;

/// Errors that can occur while stitching an association onto parents.
///
/// Any error fails the whole batch; no parent is returned half-resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StitchError {
    #[error("Failed to load association '{association}': {source}")]
    Loader {
        association: &'static str,
        source: RepositoryError,
    },
    #[error("Association '{association}' returned a row for parent {parent_id} outside the batch")]
    OrphanRow {
        association: &'static str,
        parent_id: String,
    },
}

/// Result type for stitch operations.
pub type Result<T> = std::result::Result<T, StitchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_error_display() {
        let error = StitchError::Loader {
            association: "items",
            source: RepositoryError::QueryFailed("database is locked".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Failed to load association 'items': Query failed: database is locked"
        );
    }

    #[test]
    fn test_loader_error_exposes_source() {
        use std::error::Error as _;

        let error = StitchError::Loader {
            association: "items",
            source: RepositoryError::ConnectionFailed("gone".to_string()),
        };
        assert!(error.source().is_some());
    }

    #[test]
    fn test_orphan_row_display() {
        let error = StitchError::OrphanRow {
            association: "shipments",
            parent_id: "42".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Association 'shipments' returned a row for parent 42 outside the batch"
        );
    }
}
