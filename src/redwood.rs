// 🌲 Redwood Accrual - Redwood shipments A3 has not billed yet
// Keep Redwood rows whose BOL is absent from A3, align two headers with the
// A3 layout, make sure the columns the pipeline reads exist, then code them.

use std::collections::HashSet;
use tracing::info;

use crate::codes::is_blank;
use crate::error::{CodingError, Result};
use crate::pipeline::{run_accrual, CodingContext, PipelineOutput};
use crate::table::Table;

pub const BOL_COLUMNS: &[&str] = &["BOL Number", "BOL", "BOLNumber", "Pro/BOL", "Pro / BOL"];

/// Redwood header → A3 header, matched case-insensitively
pub const HEADER_RENAMES: &[(&str, &str)] = &[
    ("Origin Address", "Origin Addresss"),
    ("Origin State", "Origin State Code"),
];

pub const REQUIRED_COLUMNS: &[&str] = &[
    "Consignor",
    "Consignee",
    "Consignor Code",
    "Consignee Code",
    "Dest Address1",
    "Dest City",
    "Dest State Code",
    "Origin Addresss",
    "Origin City",
    "Origin State Code",
    "Profit Center",
    "Cost Center",
    "Account #",
];

fn bol_column(table: &Table, name: &str) -> Result<String> {
    table
        .find_column(BOL_COLUMNS)
        .ok_or_else(|| CodingError::MissingColumn {
            table: name.to_string(),
            column: BOL_COLUMNS[0].to_string(),
        })
}

/// Redwood rows whose trimmed BOL does not appear in A3. Blank BOLs are kept.
pub fn rows_not_in_a3(a3: &Table, redwood: &Table) -> Result<Table> {
    let a3_column = bol_column(a3, "A3")?;
    let redwood_column = bol_column(redwood, "Redwood")?;

    let a3_bols: HashSet<&str> = a3
        .rows
        .iter()
        .filter_map(|row| row.get(&a3_column))
        .map(|bol| bol.trim())
        .filter(|bol| !is_blank(bol))
        .collect();

    let mut filtered = Table::new(redwood.headers.clone());
    filtered.rows = redwood
        .rows
        .iter()
        .filter(|row| {
            let bol = row.get(&redwood_column).map(|b| b.trim()).unwrap_or("");
            !a3_bols.contains(bol)
        })
        .cloned()
        .collect();

    info!(
        a3_rows = a3.rows.len(),
        redwood_rows = redwood.rows.len(),
        not_in_a3 = filtered.rows.len(),
        "redwood rows filtered by BOL"
    );
    Ok(filtered)
}

/// Filter, align headers, and run the accrual pipeline on what is left
pub fn run_redwood(a3: &Table, redwood: &Table, ctx: &CodingContext) -> Result<PipelineOutput> {
    let mut filtered = rows_not_in_a3(a3, redwood)?;
    filtered.rename_columns(HEADER_RENAMES);
    filtered.ensure_columns(REQUIRED_COLUMNS);

    let config = &ctx.config;
    filtered.ensure_columns(&[
        config.columns.invoice_number.as_str(),
        config.columns.paid_amount.as_str(),
    ]);

    run_accrual(&filtered, ctx)
}
