// ⚖️ Reconciliation Engine - accuracy flag, batch quality, balance checks
//
// Automation Accuracy = 1 iff the enriched profit center equals the expected one
// (trimmed, case-insensitive). No expected value → 0.
//
// Quality summary answers "did we find 100%?" for a coded batch, and an audit
// partition balances when header + details sum to zero within tolerance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::RecordIssue;
use crate::record::ShipmentRecord;
use crate::reference::ReferenceFingerprint;

// ============================================================================
// BALANCE RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BalanceResult {
    Balanced { header_total: f64, detail_total: f64 },
    Discrepancy { header_total: f64, detail_total: f64, difference: f64 },
}

impl BalanceResult {
    pub fn is_balanced(&self) -> bool {
        matches!(self, BalanceResult::Balanced { .. })
    }

    pub fn difference(&self) -> f64 {
        match self {
            BalanceResult::Balanced { .. } => 0.0,
            BalanceResult::Discrepancy { difference, .. } => *difference,
        }
    }
}

// ============================================================================
// QUALITY SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitySummary {
    pub run_id: String,
    pub processed_at: DateTime<Utc>,
    pub total_input: usize,
    pub duplicates_dropped: usize,
    pub records_coded: usize,
    pub records_with_assigned_code: usize,
    /// Share of coded records with an assigned code, 0-100
    pub found_percentage: f64,
    pub records_accurate: usize,
    /// Share of coded records flagged accurate, 0-100
    pub accuracy_rate: f64,
    /// False when no expected profit center column was configured
    pub accuracy_checked: bool,
    pub issue_counts: BTreeMap<String, usize>,
    pub reference_fingerprints: Vec<ReferenceFingerprint>,
}

impl QualitySummary {
    pub fn is_fully_found(&self) -> bool {
        self.records_coded > 0 && self.records_with_assigned_code == self.records_coded
    }

    pub fn issue_count(&self, kind: &str) -> usize {
        self.issue_counts.get(kind).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        format!(
            "Run {}: {} input, {} duplicates dropped, {}/{} assigned ({:.1}% found), accuracy {:.1}%",
            self.run_id,
            self.total_input,
            self.duplicates_dropped,
            self.records_with_assigned_code,
            self.records_coded,
            self.found_percentage,
            self.accuracy_rate
        )
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine {
    /// Tolerance for floating-point comparisons (default: $0.01)
    pub tolerance: f64,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine { tolerance: 0.01 }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        ReconciliationEngine { tolerance }
    }

    /// 1 when both sides are present and equal ignoring case and surrounding space
    pub fn accuracy_flag(&self, enriched: Option<&str>, expected: Option<&str>) -> u8 {
        match (enriched, expected) {
            (Some(actual), Some(expected)) => {
                let actual = actual.trim();
                let expected = expected.trim();
                u8::from(!actual.is_empty() && actual.eq_ignore_ascii_case(expected))
            }
            _ => 0,
        }
    }

    /// Score one record against its own expected profit center
    pub fn score(&self, mut record: ShipmentRecord) -> ShipmentRecord {
        record.automation_accuracy = self.accuracy_flag(
            record.profit_center_ej.as_deref(),
            record.expected_profit_center.as_deref(),
        );
        record
    }

    /// Header plus details should net to zero
    pub fn check_balance(&self, header_total: f64, detail_total: f64) -> BalanceResult {
        let difference = (header_total + detail_total).abs();
        if difference < self.tolerance {
            BalanceResult::Balanced {
                header_total,
                detail_total,
            }
        } else {
            BalanceResult::Discrepancy {
                header_total,
                detail_total,
                difference,
            }
        }
    }

    /// Batch quality metrics for a coded, deduplicated batch
    pub fn summarize(
        &self,
        total_input: usize,
        records: &[ShipmentRecord],
        issues: &[RecordIssue],
        accuracy_checked: bool,
        fingerprints: &[ReferenceFingerprint],
    ) -> QualitySummary {
        let records_with_assigned_code = records.iter().filter(|r| r.has_assigned_code()).count();
        let records_accurate = records.iter().filter(|r| r.automation_accuracy == 1).count();

        let mut issue_counts = BTreeMap::new();
        for issue in issues {
            *issue_counts.entry(issue.kind().to_string()).or_insert(0) += 1;
        }

        QualitySummary {
            run_id: Uuid::new_v4().to_string(),
            processed_at: Utc::now(),
            total_input,
            duplicates_dropped: issue_counts.get("duplicate_record").copied().unwrap_or(0),
            records_coded: records.len(),
            records_with_assigned_code,
            found_percentage: percentage(records_with_assigned_code, records.len()),
            records_accurate,
            accuracy_rate: percentage(records_accurate, records.len()),
            accuracy_checked,
            issue_counts,
            reference_fingerprints: fingerprints.to_vec(),
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
