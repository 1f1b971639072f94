// 🔗 Coding Pipeline - one batch of shipment rows in, coded rows out
//
// Per record, in order (every code step is fill-if-blank):
//   seed codes → extract from text → resolve by address → normalize
//   → classify → matrix → enrich
// Per batch: deduplicate, then score accuracy and summarize.
//
// Per-record work is a pure function of (record, &CodingContext).

use tracing::{debug, info, warn};

use crate::address::{combined_key, AddressIndex};
use crate::classifier::classify_or_keep;
use crate::codes::{extract, normalize_opt};
use crate::config::CodingConfig;
use crate::deduplication::DeduplicationEngine;
use crate::enrich::enrich;
use crate::error::{Party, RecordIssue, Result};
use crate::matrix::{resolve, MatrixInput, MatrixRule, MatrixTable};
use crate::reconciliation::{QualitySummary, ReconciliationEngine};
use crate::record::{fill_if_blank, ShipmentRecord};
use crate::reference::ReferenceStore;
use crate::table::Table;

// ============================================================================
// CONTEXT
// ============================================================================

/// Everything a record needs that is not the record itself. Built once, read-only.
pub struct CodingContext {
    pub store: ReferenceStore,
    pub address_index: AddressIndex,
    pub matrix: MatrixTable,
    pub config: CodingConfig,
}

impl CodingContext {
    pub fn new(store: ReferenceStore, matrix: MatrixTable, config: CodingConfig) -> Self {
        let address_index = store.address_index();
        CodingContext {
            store,
            address_index,
            matrix,
            config,
        }
    }

    /// Load reference tables and matrix rules named in the config.
    /// Any missing file aborts here, before a single record is touched.
    pub fn load(config: CodingConfig) -> Result<Self> {
        let store = ReferenceStore::load(&config.references)?;
        let matrix = MatrixTable::from_file(&config.matrix.rules)?;
        info!(
            rules = matrix.rule_count(),
            path = %config.matrix.rules.display(),
            "matrix rules loaded"
        );
        Ok(CodingContext::new(store, matrix, config))
    }
}

// ============================================================================
// PER-RECORD STAGES
// ============================================================================

/// Fill blank codes from codes embedded in the party text
fn extract_codes(record: &mut ShipmentRecord, ctx: &CodingContext) {
    let valid = ctx.store.valid_codes();
    if fill_if_blank(&mut record.consignor_code, extract(&record.consignor_text, valid)) {
        debug!(row = record.row, code = ?record.consignor_code, "consignor code extracted from text");
    }
    if fill_if_blank(&mut record.consignee_code, extract(&record.consignee_text, valid)) {
        debug!(row = record.row, code = ?record.consignee_code, "consignee code extracted from text");
    }
}

/// Fill blank codes by Combined Address lookup
fn resolve_addresses(record: &mut ShipmentRecord, index: &AddressIndex) {
    if record.consignor_code.is_none() {
        let key = combined_key(
            &record.consignor_address,
            &record.consignor_city,
            &record.consignor_state,
        );
        if fill_if_blank(&mut record.consignor_code, index.resolve(&key).map(str::to_string)) {
            debug!(row = record.row, key = %key, "consignor code resolved by address");
        }
    }
    if record.consignee_code.is_none() {
        let key = combined_key(
            &record.consignee_address,
            &record.consignee_city,
            &record.consignee_state,
        );
        if fill_if_blank(&mut record.consignee_code, index.resolve(&key).map(str::to_string)) {
            debug!(row = record.row, key = %key, "consignee code resolved by address");
        }
    }
}

fn normalize_codes(record: &mut ShipmentRecord) {
    record.consignor_code = record.consignor_code.as_deref().and_then(normalize_opt);
    record.consignee_code = record.consignee_code.as_deref().and_then(normalize_opt);
}

/// Run every stage on one record. Returns the coded record and its issues.
pub fn code_record(
    mut record: ShipmentRecord,
    ctx: &CodingContext,
) -> (ShipmentRecord, Vec<RecordIssue>) {
    let mut issues = Vec::new();
    let row = record.row;

    extract_codes(&mut record, ctx);
    resolve_addresses(&mut record, &ctx.address_index);
    normalize_codes(&mut record);

    if record.consignor_code.is_none() {
        issues.push(RecordIssue::UnresolvedCode {
            row,
            party: Party::Consignor,
        });
    }
    if record.consignee_code.is_none() {
        issues.push(RecordIssue::UnresolvedCode {
            row,
            party: Party::Consignee,
        });
    }

    let consignor_type = classify_or_keep(
        &record.consignor_type_raw,
        record.consignor_code.as_deref().unwrap_or(""),
        &ctx.store,
    );
    let consignee_type = classify_or_keep(
        &record.consignee_type_raw,
        record.consignee_code.as_deref().unwrap_or(""),
        &ctx.store,
    );
    record.consignor_type = Some(consignor_type);
    record.consignee_type = Some(consignee_type);

    let input = MatrixInput::from_types(consignor_type, consignee_type)
        .with_codes(record.consignor_code.as_deref(), record.consignee_code.as_deref())
        .with_parties(&record.consignor_text, &record.consignee_text)
        .with_carrier(&record.carrier)
        .with_origin_address(&record.consignor_address);
    let decision = resolve(&ctx.matrix, &input);
    debug!(
        row,
        rule = decision.rule.as_str(),
        rule_id = ?decision.rule_id,
        assigned = ?decision.assigned_code,
        "matrix decision"
    );

    if decision.rule == MatrixRule::Unmatched {
        issues.push(RecordIssue::UnmatchedTypePair {
            row,
            consignor_type: consignor_type.as_str().to_string(),
            consignee_type: consignee_type.as_str().to_string(),
        });
    }

    record.matrix_rule = Some(decision.rule);
    record.matrix_rule_id = decision.rule_id;
    fill_if_blank(&mut record.assigned_location_code, decision.assigned_code);

    let coding = enrich(
        record.assigned_location_code.as_deref(),
        record.consignee_code.as_deref(),
        &ctx.store,
    );
    if let (Some(code), false) = (&record.assigned_location_code, coding.is_mapped()) {
        issues.push(RecordIssue::UnmappedCenter {
            row,
            code: code.clone(),
        });
    }
    record.profit_center_ej = coding.profit_center;
    record.cost_center_ej = coding.cost_center;
    record.account_number_ej = Some(coding.account_number);

    (record, issues)
}

// ============================================================================
// BATCH
// ============================================================================

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub headers: Vec<String>,
    pub records: Vec<ShipmentRecord>,
    pub issues: Vec<RecordIssue>,
    pub summary: QualitySummary,
}

impl PipelineOutput {
    /// Coded rows ready for export
    pub fn to_table(&self) -> Table {
        crate::record::to_table(&self.headers, &self.records)
    }
}

/// Parse rows into records using the configured column names
pub fn read_records(table: &Table, config: &CodingConfig) -> Vec<ShipmentRecord> {
    let expected = config.accuracy.expected_profit_center_column.as_deref();
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| ShipmentRecord::from_row(i, row, &config.columns, expected))
        .collect()
}

/// Code a whole batch: dedup, per-record stages, accuracy, quality summary
pub fn run_accrual(table: &Table, ctx: &CodingContext) -> Result<PipelineOutput> {
    let config = &ctx.config;
    // Missing values only mean no record can be a duplicate
    for column in [&config.columns.invoice_number, &config.columns.paid_amount] {
        if !table.has_column(column) {
            warn!(column = %column, "column not in input; duplicates cannot be detected");
        }
    }

    let accuracy_checked = match &config.accuracy.expected_profit_center_column {
        Some(column) if table.has_column(column) => true,
        Some(column) => {
            warn!(column = %column, "expected profit center column not in input; accuracy will be 0");
            false
        }
        None => {
            warn!("no expected profit center column configured; accuracy will be 0");
            false
        }
    };

    let records = read_records(table, config);
    let total_input = records.len();

    let dedup = DeduplicationEngine::new().deduplicate(records);
    let mut issues = dedup.issues();
    for m in &dedup.dropped {
        debug!(row = m.dropped_row, first_row = m.kept_row, "{}", m.reason);
    }

    let reconciler = ReconciliationEngine::new();
    let mut coded = Vec::with_capacity(dedup.kept.len());
    for record in dedup.kept {
        let (record, record_issues) = code_record(record, ctx);
        for issue in &record_issues {
            warn!(kind = issue.kind(), "{}", issue);
        }
        issues.extend(record_issues);
        coded.push(reconciler.score(record));
    }

    let summary = reconciler.summarize(
        total_input,
        &coded,
        &issues,
        accuracy_checked,
        ctx.store.fingerprints(),
    );
    info!(
        run_id = %summary.run_id,
        total = summary.total_input,
        duplicates = summary.duplicates_dropped,
        assigned = summary.records_with_assigned_code,
        found_pct = summary.found_percentage,
        "accrual coding complete"
    );

    Ok(PipelineOutput {
        headers: table.headers.clone(),
        records: coded,
        issues,
        summary,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::AccountNumber;
    use crate::reference::{CenterCodes, LocationRecord, SiteType};
    use crate::table::Row;

    fn location(code: &str, address: &str, city: &str, state: &str, site_type: SiteType) -> LocationRecord {
        LocationRecord {
            code: code.to_string(),
            address: address.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            site_type,
            profit_center: None,
            cost_center: None,
        }
    }

    fn centers(code: &str) -> (String, CenterCodes) {
        (
            code.to_string(),
            CenterCodes {
                profit_center: format!("P{}", code),
                cost_center: format!("C{}", code),
            },
        )
    }

    fn create_test_context() -> CodingContext {
        let store = ReferenceStore::from_parts(
            vec![
                location("0K35", "6800 Cintas Blvd", "Mason", "OH", SiteType::UsDc),
                location("024P", "12 Loading Way", "Toledo", "OH", SiteType::Lc),
                location("0G59", "1 Network Rd", "Dayton", "OH", SiteType::UsDc),
            ],
            vec![centers("0K35"), centers("024P"), centers("0G59")],
            vec!["0K35".to_string(), "024P".to_string(), "0G59".to_string()],
        );
        let matrix = MatrixTable::from_json(
            r#"{
                "rules": [
                    {"id": "non-cintas-to-us-dc", "priority": 50,
                     "conditions": [
                        {"kind": "origin_type", "types": ["NON_CINTAS"]},
                        {"kind": "destination_type", "types": ["US_DC"]}],
                     "assign": {"to": "special", "code": "0G59"}},
                    {"id": "dc-to-location", "priority": 10,
                     "conditions": [
                        {"kind": "origin_type", "types": ["US_DC"]},
                        {"kind": "destination_type", "types": ["LC"]}],
                     "assign": {"to": "destination"}}
                ]
            }"#,
        )
        .unwrap();

        let mut config = CodingConfig::default();
        config.accuracy.expected_profit_center_column = Some("Profit Center".to_string());
        CodingContext::new(store, matrix, config)
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn record(pairs: &[(&str, &str)]) -> ShipmentRecord {
        let config = CodingConfig::default();
        ShipmentRecord::from_row(0, &row(pairs), &config.columns, Some("Profit Center"))
    }

    #[test]
    fn test_blank_consignor_resolved_by_address() {
        let ctx = create_test_context();
        let input = record(&[
            ("Consignor Code", ""),
            ("Origin Addresss", "6800 Cintas Blvd"),
            ("Origin City", "Mason"),
            ("Origin State Code", "OH"),
            ("Consignee Code", "24P"),
        ]);

        let (coded, issues) = code_record(input, &ctx);

        assert_eq!(coded.consignor_code.as_deref(), Some("0K35"));
        assert_eq!(coded.consignor_type, Some(SiteType::UsDc));
        assert_eq!(coded.consignee_type, Some(SiteType::Lc));
        assert_eq!(coded.matrix_rule, Some(MatrixRule::Destination));
        assert_eq!(coded.assigned_location_code.as_deref(), Some("024P"));
        assert_eq!(coded.profit_center_ej.as_deref(), Some("P024P"));
        assert_eq!(coded.account_number_ej, Some(AccountNumber::InboundFreight));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_existing_code_never_overwritten() {
        let ctx = create_test_context();
        // Address points at 024P's site, text mentions 024P; the code stays 0K35
        let input = record(&[
            ("Consignee Code", "0K35"),
            ("Consignee", "Millennium 024P Loading"),
            ("Dest Address1", "12 Loading Way"),
            ("Dest City", "Toledo"),
            ("Dest State Code", "OH"),
        ]);

        let (coded, _) = code_record(input, &ctx);
        assert_eq!(coded.consignee_code.as_deref(), Some("0K35"));
    }

    #[test]
    fn test_extraction_before_address() {
        let ctx = create_test_context();
        let input = record(&[
            ("Consignor", "Millennium 024P Loading"),
            ("Origin Addresss", "6800 Cintas Blvd"),
            ("Origin City", "Mason"),
            ("Origin State Code", "OH"),
        ]);

        let (coded, _) = code_record(input, &ctx);
        assert_eq!(coded.consignor_code.as_deref(), Some("024P"));
    }

    #[test]
    fn test_special_rule_and_g59_account() {
        let ctx = create_test_context();
        let input = record(&[("Consignor Code", "9Z99"), ("Consignee Code", "0K35")]);

        let (coded, issues) = code_record(input, &ctx);

        assert_eq!(coded.consignor_type, Some(SiteType::NonCintas));
        assert_eq!(coded.matrix_rule, Some(MatrixRule::Special));
        assert_eq!(coded.assigned_location_code.as_deref(), Some("0G59"));
        assert_eq!(coded.account_number_ej, Some(AccountNumber::InboundFreight));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unresolved_and_unmatched_are_reported() {
        let ctx = create_test_context();
        let input = record(&[("Consignor", "somewhere"), ("Consignee Code", "024P")]);

        let (coded, issues) = code_record(input, &ctx);

        assert_eq!(coded.consignor_code, None);
        assert_eq!(coded.consignor_type, Some(SiteType::Unknown));
        assert_eq!(coded.matrix_rule, Some(MatrixRule::Unmatched));
        assert_eq!(coded.assigned_location_code, None);
        assert_eq!(coded.account_number_ej, Some(AccountNumber::OutboundFreight));
        assert!(issues.contains(&RecordIssue::UnresolvedCode {
            row: 0,
            party: Party::Consignor
        }));
        assert!(issues
            .iter()
            .any(|i| matches!(i, RecordIssue::UnmatchedTypePair { .. })));
    }

    #[test]
    fn test_coding_is_deterministic() {
        let ctx = create_test_context();
        let input = record(&[("Consignor Code", "0K35"), ("Consignee Code", "024P")]);
        let (a, _) = code_record(input.clone(), &ctx);
        let (b, _) = code_record(input, &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn test_run_accrual_batch() {
        let ctx = create_test_context();
        let mut table = Table::new(
            ["Invoice Number", "Paid Amount", "Consignor Code", "Consignee Code", "Profit Center"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        table.rows = vec![
            row(&[("Invoice Number", "INV-1"), ("Paid Amount", "100"), ("Consignor Code", "0K35"), ("Consignee Code", "024P"), ("Profit Center", "p024p")]),
            row(&[("Invoice Number", "INV-1"), ("Paid Amount", "100.00"), ("Consignor Code", "0K35"), ("Consignee Code", "024P"), ("Profit Center", "P024P")]),
            row(&[("Invoice Number", "INV-2"), ("Paid Amount", "50"), ("Consignor Code", "9Z99"), ("Consignee Code", "0K35"), ("Profit Center", "PXXXX")]),
        ];

        let output = run_accrual(&table, &ctx).unwrap();

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0].row, 0);
        assert_eq!(output.records[0].automation_accuracy, 1);
        assert_eq!(output.records[1].automation_accuracy, 0);
        assert_eq!(output.summary.total_input, 3);
        assert_eq!(output.summary.duplicates_dropped, 1);
        assert!(output.summary.is_fully_found());
        assert!(output.summary.accuracy_checked);

        let exported = output.to_table();
        assert_eq!(exported.rows.len(), 2);
        assert_eq!(exported.rows[1]["Assigned Location Code"], "0G59");
        assert_eq!(exported.rows[1]["Account # EJ"], "621000");
    }

    #[test]
    fn test_run_accrual_without_invoice_column_still_codes() {
        let ctx = create_test_context();
        let mut table = Table::new(
            ["Consignor Code", "Consignee Code", "Paid Amount"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        table.rows = vec![
            row(&[("Consignor Code", "0K35"), ("Consignee Code", "024P"), ("Paid Amount", "100")]),
            row(&[("Consignor Code", "0K35"), ("Consignee Code", "024P"), ("Paid Amount", "100")]),
        ];

        let output = run_accrual(&table, &ctx).unwrap();

        assert_eq!(output.records.len(), 2);
        assert_eq!(output.summary.duplicates_dropped, 0);
        assert!(output
            .records
            .iter()
            .all(|r| r.assigned_location_code.as_deref() == Some("024P")));
        assert!(!output.summary.accuracy_checked);
    }

    #[test]
    fn test_unmapped_center_is_reported() {
        let base = create_test_context();
        // 0Q11 is a valid LC with no center mapping and no location centers
        let store = ReferenceStore::from_parts(
            vec![
                location("0K35", "6800 Cintas Blvd", "Mason", "OH", SiteType::UsDc),
                location("0Q11", "3 Dock St", "Akron", "OH", SiteType::Lc),
            ],
            vec![centers("0K35")],
            vec!["0K35".to_string(), "0Q11".to_string()],
        );
        let ctx = CodingContext::new(store, base.matrix, base.config);
        let input = record(&[("Consignor Code", "0K35"), ("Consignee Code", "0Q11")]);

        let (coded, issues) = code_record(input, &ctx);

        assert_eq!(coded.assigned_location_code.as_deref(), Some("0Q11"));
        assert_eq!(coded.profit_center_ej, None);
        assert_eq!(coded.cost_center_ej, None);
        assert_eq!(
            issues,
            vec![RecordIssue::UnmappedCenter {
                row: 0,
                code: "0Q11".to_string()
            }]
        );
    }
}
