// Freight Accrual Coding - Core Library
// Assigns location codes, profit/cost centers and GL accounts to freight invoice lines

pub mod error;
pub mod config;
pub mod logging;
pub mod table;
pub mod codes;          // Code normalizer + extractor
pub mod address;        // Combined Address key + index
pub mod reference;      // Reference Store
pub mod classifier;     // Site type per code
pub mod matrix;         // Decision table
pub mod enrich;         // Profit/cost center + account
pub mod record;
pub mod deduplication;
pub mod reconciliation;
pub mod pipeline;
pub mod audit;          // Weekly Audit mode
pub mod redwood;        // Redwood Accrual mode

// Re-export commonly used types
pub use error::{CodingError, Party, RecordIssue, Result};
pub use config::{AccuracyConfig, AuditConfig, CodingConfig, ColumnMap, MatrixConfig, ReferencePaths};
pub use table::{Row, Table};
pub use address::{combined_key, AddressIndex};
pub use reference::{
    CenterCodes, LocationRecord, ReferenceFingerprint, ReferenceStore, SiteType,
};
pub use classifier::{classify, classify_or_keep};
pub use matrix::{
    Assignment, Condition, MatrixDecision, MatrixEntry, MatrixInput, MatrixRule, MatrixTable,
};
pub use enrich::{enrich, AccountNumber, FinancialCoding};
pub use record::{ShipmentRecord, OUTPUT_COLUMNS};
pub use deduplication::{DeduplicationEngine, DeduplicationResult, DuplicateMatch};
pub use reconciliation::{BalanceResult, QualitySummary, ReconciliationEngine};
pub use pipeline::{code_record, run_accrual, CodingContext, PipelineOutput};
pub use audit::{AuditPartition, AuditSummarizer, AuditSummary, Currency, TaxCategory};
pub use redwood::{rows_not_in_a3, run_redwood};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
