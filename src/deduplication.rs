// 🔍 Deduplication Engine - drop repeated invoice lines
// Duplicate = same invoice number AND same paid amount (to the cent), both present.
// First occurrence survives; input order is preserved.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RecordIssue;
use crate::record::ShipmentRecord;

// ============================================================================
// DUPLICATE MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Row of the record that was kept
    pub kept_row: usize,

    /// Row of the record that was dropped
    pub dropped_row: usize,

    /// Human-readable reason
    pub reason: String,
}

impl DuplicateMatch {
    pub fn to_issue(&self) -> RecordIssue {
        RecordIssue::DuplicateRecord {
            row: self.dropped_row,
            first_row: self.kept_row,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeduplicationResult {
    pub kept: Vec<ShipmentRecord>,
    pub dropped: Vec<DuplicateMatch>,
}

impl DeduplicationResult {
    pub fn issues(&self) -> Vec<RecordIssue> {
        self.dropped.iter().map(DuplicateMatch::to_issue).collect()
    }
}

// ============================================================================
// DEDUPLICATION ENGINE
// ============================================================================

pub struct DeduplicationEngine {
    /// Amounts are compared after scaling by this factor (default: 100, cents)
    pub amount_scale: f64,
}

impl DeduplicationEngine {
    pub fn new() -> Self {
        DeduplicationEngine { amount_scale: 100.0 }
    }

    /// Key for a record, or `None` when it can never be a duplicate
    fn key(&self, record: &ShipmentRecord) -> Option<(String, i64)> {
        let invoice = record.invoice_number.trim();
        if invoice.is_empty() {
            return None;
        }
        let amount = record.paid_amount?;
        Some((invoice.to_string(), (amount * self.amount_scale).round() as i64))
    }

    /// Find duplicates without consuming the records
    pub fn find_duplicates(&self, records: &[ShipmentRecord]) -> Vec<DuplicateMatch> {
        let mut first_seen: HashMap<(String, i64), usize> = HashMap::new();
        let mut matches = Vec::new();

        for record in records {
            let Some(key) = self.key(record) else {
                continue;
            };

            match first_seen.get(&key) {
                Some(&kept_row) => matches.push(DuplicateMatch {
                    kept_row,
                    dropped_row: record.row,
                    reason: format!(
                        "Duplicate invoice: {} | ${:.2}",
                        record.invoice_number,
                        record.paid_amount.unwrap_or_default()
                    ),
                }),
                None => {
                    first_seen.insert(key, record.row);
                }
            }
        }

        matches
    }

    /// Stable removal: survivors keep their input order
    pub fn deduplicate(&self, records: Vec<ShipmentRecord>) -> DeduplicationResult {
        let dropped = self.find_duplicates(&records);
        let dropped_rows: std::collections::HashSet<usize> =
            dropped.iter().map(|m| m.dropped_row).collect();

        let kept = records
            .into_iter()
            .filter(|r| !dropped_rows.contains(&r.row))
            .collect();

        DeduplicationResult { kept, dropped }
    }
}

impl Default for DeduplicationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(row: usize, invoice: &str, amount: Option<f64>) -> ShipmentRecord {
        ShipmentRecord {
            row,
            invoice_number: invoice.to_string(),
            paid_amount: amount,
            paid_amount_raw: amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
            consignor_text: format!("Shipper {}", row),
            ..ShipmentRecord::default()
        }
    }

    #[test]
    fn test_first_occurrence_survives() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0, "INV-1", Some(100.0)),
            create_test_record(1, "INV-1", Some(100.0)),
        ];

        let result = engine.deduplicate(records);

        assert_eq!(result.kept.len(), 1);
        assert_eq!(result.kept[0].row, 0);
        assert_eq!(result.kept[0].consignor_text, "Shipper 0");
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(
            result.issues(),
            vec![RecordIssue::DuplicateRecord { row: 1, first_row: 0 }]
        );
    }

    #[test]
    fn test_order_preserved() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0, "A", Some(1.0)),
            create_test_record(1, "B", Some(2.0)),
            create_test_record(2, "A", Some(1.0)),
            create_test_record(3, "C", Some(3.0)),
            create_test_record(4, "B", Some(2.0)),
        ];

        let rows: Vec<usize> = engine.deduplicate(records).kept.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 1, 3]);
    }

    #[test]
    fn test_amounts_compared_to_the_cent() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0, "INV-1", Some(100.001)),
            create_test_record(1, "INV-1", Some(100.0)),
            create_test_record(2, "INV-1", Some(100.02)),
        ];

        let matches = engine.find_duplicates(&records);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].dropped_row, 1);
    }

    #[test]
    fn test_invoice_case_is_significant() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0, "inv-1", Some(100.0)),
            create_test_record(1, "INV-1", Some(100.0)),
            create_test_record(2, " INV-1 ", Some(100.0)),
        ];

        let result = engine.deduplicate(records);
        let rows: Vec<usize> = result.kept.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(result.issues(), vec![RecordIssue::DuplicateRecord { row: 2, first_row: 1 }]);
    }

    #[test]
    fn test_same_invoice_different_amount_kept() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0, "INV-1", Some(100.0)),
            create_test_record(1, "INV-1", Some(50.0)),
        ];
        assert!(engine.find_duplicates(&records).is_empty());
    }

    #[test]
    fn test_missing_fields_never_match() {
        let engine = DeduplicationEngine::new();
        let records = vec![
            create_test_record(0, "", Some(100.0)),
            create_test_record(1, "", Some(100.0)),
            create_test_record(2, "INV-9", None),
            create_test_record(3, "INV-9", None),
        ];

        let result = engine.deduplicate(records);
        assert_eq!(result.kept.len(), 4);
        assert!(result.dropped.is_empty());
    }
}
