// ❗ Error taxonomy
// Fatal errors abort the run before any record is coded.
// Per-record issues never abort; they are collected and counted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// FATAL ERRORS
// ============================================================================

#[derive(Error, Debug)]
pub enum CodingError {
    #[error("Missing reference file: {}", .0.display())]
    MissingReferenceFile(PathBuf),

    #[error("{table}: missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("CSV error in {table}: {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Matrix rules error: {0}")]
    MatrixRules(String),
}

pub type Result<T> = std::result::Result<T, CodingError>;

// ============================================================================
// PER-RECORD ISSUES
// ============================================================================

/// Which party of the shipment an issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Consignor,
    Consignee,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Consignor => "consignor",
            Party::Consignee => "consignee",
        }
    }
}

/// Non-fatal condition raised while coding one record.
///
/// `row` is the zero-based position of the record in the input batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordIssue {
    /// Code still blank after extraction and address lookup
    UnresolvedCode { row: usize, party: Party },

    /// Assigned code has no profit/cost center mapping
    UnmappedCenter { row: usize, code: String },

    /// No matrix rule matched and the fallback assigned nothing
    UnmatchedTypePair {
        row: usize,
        consignor_type: String,
        consignee_type: String,
    },

    /// Dropped as a duplicate of an earlier record
    DuplicateRecord { row: usize, first_row: usize },
}

impl RecordIssue {
    pub fn row(&self) -> usize {
        match self {
            RecordIssue::UnresolvedCode { row, .. }
            | RecordIssue::UnmappedCenter { row, .. }
            | RecordIssue::UnmatchedTypePair { row, .. }
            | RecordIssue::DuplicateRecord { row, .. } => *row,
        }
    }

    /// Short kind label used for counting in the quality summary
    pub fn kind(&self) -> &'static str {
        match self {
            RecordIssue::UnresolvedCode { .. } => "unresolved_code",
            RecordIssue::UnmappedCenter { .. } => "unmapped_center",
            RecordIssue::UnmatchedTypePair { .. } => "unmatched_type_pair",
            RecordIssue::DuplicateRecord { .. } => "duplicate_record",
        }
    }
}

impl std::fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordIssue::UnresolvedCode { row, party } => {
                write!(f, "row {}: {} code unresolved", row, party.as_str())
            }
            RecordIssue::UnmappedCenter { row, code } => {
                write!(f, "row {}: no profit/cost center for {}", row, code)
            }
            RecordIssue::UnmatchedTypePair {
                row,
                consignor_type,
                consignee_type,
            } => write!(
                f,
                "row {}: no matrix rule for {} -> {}",
                row, consignor_type, consignee_type
            ),
            RecordIssue::DuplicateRecord { row, first_row } => {
                write!(f, "row {}: duplicate of row {}", row, first_row)
            }
        }
    }
}
