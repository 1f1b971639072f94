// 🚚 Shipment Record - one freight invoice line flowing through the pipeline
// Input fields are read once from the row; derived fields are filled stage by
// stage. Code fields are fill-if-blank: once set, no later stage overwrites them.

use serde::{Deserialize, Serialize};

use crate::codes::{is_blank, normalize_opt};
use crate::config::ColumnMap;
use crate::enrich::AccountNumber;
use crate::matrix::MatrixRule;
use crate::reference::SiteType;
use crate::table::{Row, Table};

/// Columns appended to every coded row, in export order
pub const OUTPUT_COLUMNS: &[&str] = &[
    "Consignor Code",
    "Consignee Code",
    "Consignor Type",
    "Consignee Type",
    "Assigned Location Code",
    "Matrix Rule",
    "Profit Center EJ",
    "Cost Center EJ",
    "Account # EJ",
    "Automation Accuracy",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    /// Zero-based position in the input batch
    pub row: usize,

    /// Original row, passed through to export untouched
    #[serde(skip)]
    pub source: Row,

    // ========================================================================
    // INPUT FIELDS
    // ========================================================================
    pub consignor_text: String,
    pub consignee_text: String,
    pub consignor_code_raw: String,
    pub consignee_code_raw: String,
    pub consignor_address: String,
    pub consignor_city: String,
    pub consignor_state: String,
    pub consignee_address: String,
    pub consignee_city: String,
    pub consignee_state: String,
    /// Type labels already present on the row, if any
    pub consignor_type_raw: String,
    pub consignee_type_raw: String,
    pub carrier: String,
    pub invoice_number: String,
    pub paid_amount_raw: String,
    pub paid_amount: Option<f64>,
    pub currency: String,
    pub duty: Option<f64>,
    pub gst_pst: Option<f64>,
    pub hst: Option<f64>,
    pub qst: Option<f64>,
    /// Profit center the row is checked against for Automation Accuracy
    pub expected_profit_center: Option<String>,

    // ========================================================================
    // DERIVED FIELDS
    // ========================================================================
    pub consignor_code: Option<String>,
    pub consignee_code: Option<String>,
    pub consignor_type: Option<SiteType>,
    pub consignee_type: Option<SiteType>,
    pub assigned_location_code: Option<String>,
    pub matrix_rule: Option<MatrixRule>,
    pub matrix_rule_id: Option<String>,
    pub profit_center_ej: Option<String>,
    pub cost_center_ej: Option<String>,
    pub account_number_ej: Option<AccountNumber>,
    pub automation_accuracy: u8,
}

fn text(row: &Row, column: &str) -> String {
    row.get(column)
        .map(|v| v.trim())
        .filter(|v| !is_blank(v))
        .unwrap_or("")
        .to_string()
}

fn amount(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(|v| parse_amount(v))
}

/// Parse "$1,234.50", "(12.00)" or "-12" style amounts. Blank → `None`.
pub fn parse_amount(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if is_blank(trimmed) {
        return None;
    }

    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '(' | ')' | ' '))
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| if negative { -v.abs() } else { v })
}

/// Set `slot` only when it is empty. Returns true when a value was written.
pub fn fill_if_blank(slot: &mut Option<String>, value: Option<String>) -> bool {
    if slot.is_some() {
        return false;
    }
    match value {
        Some(v) if !v.is_empty() => {
            *slot = Some(v);
            true
        }
        _ => false,
    }
}

impl ShipmentRecord {
    /// Read one input row using the configured column names
    pub fn from_row(
        row_index: usize,
        row: &Row,
        columns: &ColumnMap,
        expected_profit_center_column: Option<&str>,
    ) -> Self {
        // Origin/Dest Type Code take priority over the plain code columns
        let origin_type_code = text(row, &columns.origin_type_code);
        let dest_type_code = text(row, &columns.dest_type_code);
        let consignor_code_raw = if origin_type_code.is_empty() {
            text(row, &columns.consignor_code)
        } else {
            origin_type_code
        };
        let consignee_code_raw = if dest_type_code.is_empty() {
            text(row, &columns.consignee_code)
        } else {
            dest_type_code
        };

        let paid_amount_raw = text(row, &columns.paid_amount);

        ShipmentRecord {
            row: row_index,
            source: row.clone(),
            consignor_text: text(row, &columns.consignor),
            consignee_text: text(row, &columns.consignee),
            consignor_code: normalize_opt(&consignor_code_raw),
            consignee_code: normalize_opt(&consignee_code_raw),
            consignor_code_raw,
            consignee_code_raw,
            consignor_address: text(row, &columns.origin_address),
            consignor_city: text(row, &columns.origin_city),
            consignor_state: text(row, &columns.origin_state),
            consignee_address: text(row, &columns.dest_address),
            consignee_city: text(row, &columns.dest_city),
            consignee_state: text(row, &columns.dest_state),
            consignor_type_raw: text(row, &columns.consignor_type),
            consignee_type_raw: text(row, &columns.consignee_type),
            carrier: text(row, &columns.carrier),
            invoice_number: text(row, &columns.invoice_number),
            paid_amount: parse_amount(&paid_amount_raw),
            paid_amount_raw,
            currency: text(row, &columns.currency).to_uppercase(),
            duty: amount(row, &columns.duty),
            gst_pst: amount(row, &columns.gst_pst),
            hst: amount(row, &columns.hst),
            qst: amount(row, &columns.qst),
            expected_profit_center: expected_profit_center_column
                .map(|column| text(row, column))
                .filter(|v| !v.is_empty()),
            ..ShipmentRecord::default()
        }
    }

    /// True once the matrix has charged the record to a code
    pub fn has_assigned_code(&self) -> bool {
        self.assigned_location_code.is_some()
    }

    /// Paid amount minus duty and any Canadian sales taxes
    pub fn net_of_tax(&self) -> f64 {
        self.paid_amount.unwrap_or(0.0)
            - self.duty.unwrap_or(0.0)
            - self.gst_pst.unwrap_or(0.0)
            - self.hst.unwrap_or(0.0)
            - self.qst.unwrap_or(0.0)
    }

    /// The source row plus every derived column
    pub fn to_output_row(&self) -> Row {
        let mut row = self.source.clone();
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let site = |v: &Option<SiteType>| v.map(|t| t.as_str().to_string()).unwrap_or_default();

        row.insert("Consignor Code".to_string(), opt(&self.consignor_code));
        row.insert("Consignee Code".to_string(), opt(&self.consignee_code));
        row.insert("Consignor Type".to_string(), site(&self.consignor_type));
        row.insert("Consignee Type".to_string(), site(&self.consignee_type));
        row.insert(
            "Assigned Location Code".to_string(),
            opt(&self.assigned_location_code),
        );
        row.insert(
            "Matrix Rule".to_string(),
            self.matrix_rule
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
        );
        row.insert("Profit Center EJ".to_string(), opt(&self.profit_center_ej));
        row.insert("Cost Center EJ".to_string(), opt(&self.cost_center_ej));
        row.insert(
            "Account # EJ".to_string(),
            self.account_number_ej
                .map(|a| a.as_str().to_string())
                .unwrap_or_default(),
        );
        row.insert(
            "Automation Accuracy".to_string(),
            self.automation_accuracy.to_string(),
        );
        row
    }
}

/// Assemble the export table: input headers first, then derived columns not already present
pub fn to_table(input_headers: &[String], records: &[ShipmentRecord]) -> Table {
    let mut headers: Vec<String> = input_headers.to_vec();
    for column in OUTPUT_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            headers.push(column.to_string());
        }
    }

    let mut table = Table::new(headers);
    table.rows = records.iter().map(|r| r.to_output_row()).collect();
    table
}

// ============================================================================
// TESTS
// ============================================================================
