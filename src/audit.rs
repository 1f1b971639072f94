// 🧾 Weekly Audit Summarizer - currency-segmented journal summary
//
// Per currency partition (USD, CAD):
//   HEADER  = −Σ paid amount
//   DETAIL  = Σ (paid − duty − GST/PST − HST − QST) by (profit center, cost center, account)
//   TAX     = Σ tax by (profit center, cost center) on the tax category's account
// Header + details net to zero when every amount is accounted for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::enrich::AccountNumber;
use crate::error::Result;
use crate::reconciliation::{BalanceResult, ReconciliationEngine};
use crate::record::ShipmentRecord;
use crate::table::{Row, Table};

// ============================================================================
// CURRENCY / TAX CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cad,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::Usd, Currency::Cad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Cad => "CAD",
        }
    }

    /// "USA" shows up in the currency tab as an alias for USD
    pub fn parse(value: &str) -> Option<Currency> {
        match value.trim().to_uppercase().as_str() {
            "USD" | "USA" | "US" => Some(Currency::Usd),
            "CAD" | "CAN" | "CA" => Some(Currency::Cad),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxCategory {
    GstPst,
    Hst,
    Qst,
    Duty,
}

impl TaxCategory {
    pub const ALL: [TaxCategory; 4] = [
        TaxCategory::GstPst,
        TaxCategory::Hst,
        TaxCategory::Qst,
        TaxCategory::Duty,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaxCategory::GstPst => "GST/PST",
            TaxCategory::Hst => "HST",
            TaxCategory::Qst => "QST",
            TaxCategory::Duty => "Duty",
        }
    }

    pub fn account(&self) -> AccountNumber {
        match self {
            TaxCategory::GstPst => AccountNumber::GstPst,
            TaxCategory::Hst => AccountNumber::Hst,
            TaxCategory::Qst => AccountNumber::Qst,
            TaxCategory::Duty => AccountNumber::Duty,
        }
    }

    fn amount(&self, record: &ShipmentRecord) -> f64 {
        match self {
            TaxCategory::GstPst => record.gst_pst,
            TaxCategory::Hst => record.hst,
            TaxCategory::Qst => record.qst,
            TaxCategory::Duty => record.duty,
        }
        .unwrap_or(0.0)
    }
}

// ============================================================================
// SUMMARY STRUCTURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLine {
    pub profit_center: String,
    pub cost_center: String,
    pub account: AccountNumber,
    pub amount: f64,
    /// Tax category label for tax lines, `None` for freight lines
    pub tax: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPartition {
    pub currency: Currency,
    pub record_count: usize,
    pub header_total: f64,
    pub details: Vec<AuditLine>,
    pub balance: BalanceResult,
}

impl AuditPartition {
    pub fn detail_total(&self) -> f64 {
        self.details.iter().map(|d| d.amount).sum()
    }

    /// Header row first, then detail rows. Account numbers stay text.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(
            AUDIT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        );

        table.rows.push(audit_row(
            "HEADER",
            self.currency,
            "",
            "",
            "",
            "",
            self.header_total,
        ));
        for line in &self.details {
            table.rows.push(audit_row(
                "DETAIL",
                self.currency,
                &line.profit_center,
                &line.cost_center,
                line.account.as_str(),
                line.tax.as_deref().unwrap_or(""),
                line.amount,
            ));
        }
        table
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub batch: Option<String>,
    pub partitions: Vec<AuditPartition>,
    /// Rows dropped by the batch filter
    pub filtered_out: usize,
    /// Rows in a currency other than USD/CAD
    pub skipped_currency: usize,
}

impl AuditSummary {
    pub fn partition(&self, currency: Currency) -> Option<&AuditPartition> {
        self.partitions.iter().find(|p| p.currency == currency)
    }

    pub fn is_balanced(&self) -> bool {
        self.partitions.iter().all(|p| p.balance.is_balanced())
    }

    /// Write one CSV per partition into `dir`; returns the paths written
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for partition in &self.partitions {
            let path = dir.join(format!(
                "weekly_audit_{}.csv",
                partition.currency.as_str().to_lowercase()
            ));
            partition.to_table().write(&path)?;
            written.push(path);
        }
        written.push(write_tax_mapping(dir)?);
        Ok(written)
    }
}

pub const AUDIT_COLUMNS: &[&str] = &[
    "Line Type",
    "Currency",
    "Profit Center",
    "Cost Center",
    "Account #",
    "Tax Category",
    "Amount",
];

fn audit_row(
    line_type: &str,
    currency: Currency,
    profit_center: &str,
    cost_center: &str,
    account: &str,
    tax: &str,
    amount: f64,
) -> Row {
    let values = [
        line_type,
        currency.as_str(),
        profit_center,
        cost_center,
        account,
        tax,
    ];
    let mut row: Row = AUDIT_COLUMNS
        .iter()
        .zip(values.iter())
        .map(|(c, v)| (c.to_string(), v.to_string()))
        .collect();
    row.insert("Amount".to_string(), format!("{:.2}", amount));
    row
}

fn write_tax_mapping(dir: &Path) -> Result<PathBuf> {
    let mut table = Table::new(vec!["Tax Category".to_string(), "Account #".to_string()]);
    for category in TaxCategory::ALL {
        let mut row = Row::new();
        row.insert("Tax Category".to_string(), category.label().to_string());
        row.insert("Account #".to_string(), category.account().as_str().to_string());
        table.rows.push(row);
    }
    let path = dir.join("weekly_audit_tax_accounts.csv");
    table.write(&path)?;
    Ok(path)
}

// ============================================================================
// SUMMARIZER
// ============================================================================

pub struct AuditSummarizer {
    /// Column in the source row holding the run/batch number
    pub batch_column: String,
    pub reconciler: ReconciliationEngine,
}

type GroupKey = (String, String, AccountNumber, Option<&'static str>);

impl AuditSummarizer {
    pub fn new(batch_column: &str) -> Self {
        AuditSummarizer {
            batch_column: batch_column.to_string(),
            reconciler: ReconciliationEngine::new(),
        }
    }

    fn in_batch(&self, record: &ShipmentRecord, batch: Option<&str>) -> bool {
        match batch {
            None => true,
            Some(batch) => record
                .source
                .get(&self.batch_column)
                .map_or(false, |v| v.trim() == batch.trim()),
        }
    }

    /// Summarize enriched records, optionally restricted to one batch
    pub fn summarize(&self, records: &[ShipmentRecord], batch: Option<&str>) -> AuditSummary {
        let mut filtered_out = 0;
        let mut skipped_currency = 0;
        let mut by_currency: BTreeMap<&'static str, Vec<&ShipmentRecord>> = BTreeMap::new();

        for record in records {
            if !self.in_batch(record, batch) {
                filtered_out += 1;
                continue;
            }
            match Currency::parse(&record.currency) {
                Some(currency) => by_currency.entry(currency.as_str()).or_default().push(record),
                None => {
                    debug!(row = record.row, currency = %record.currency, "currency not summarized");
                    skipped_currency += 1;
                }
            }
        }

        if skipped_currency > 0 {
            warn!(skipped = skipped_currency, "rows in other currencies left out of the audit");
        }

        let partitions = Currency::ALL
            .iter()
            .map(|currency| {
                let members = by_currency
                    .get(currency.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                self.partition(*currency, members)
            })
            .collect();

        let summary = AuditSummary {
            batch: batch.map(str::to_string),
            partitions,
            filtered_out,
            skipped_currency,
        };
        for p in &summary.partitions {
            info!(
                currency = p.currency.as_str(),
                records = p.record_count,
                header = p.header_total,
                details = p.details.len(),
                balanced = p.balance.is_balanced(),
                "audit partition"
            );
        }
        summary
    }

    fn partition(&self, currency: Currency, records: &[&ShipmentRecord]) -> AuditPartition {
        let header_total = -records
            .iter()
            .map(|r| r.paid_amount.unwrap_or(0.0))
            .sum::<f64>();

        let mut groups: BTreeMap<GroupKey, f64> = BTreeMap::new();
        for record in records {
            let pc = record.profit_center_ej.clone().unwrap_or_default();
            let cc = record.cost_center_ej.clone().unwrap_or_default();
            let account = record
                .account_number_ej
                .unwrap_or(AccountNumber::OutboundFreight);

            *groups
                .entry((pc.clone(), cc.clone(), account, None))
                .or_insert(0.0) += record.net_of_tax();

            for category in TaxCategory::ALL {
                let amount = category.amount(record);
                if amount != 0.0 {
                    *groups
                        .entry((pc.clone(), cc.clone(), category.account(), Some(category.label())))
                        .or_insert(0.0) += amount;
                }
            }
        }

        let details: Vec<AuditLine> = groups
            .into_iter()
            .map(|((profit_center, cost_center, account, tax), amount)| AuditLine {
                profit_center,
                cost_center,
                account,
                amount,
                tax: tax.map(str::to_string),
            })
            .collect();

        let detail_total: f64 = details.iter().map(|d| d.amount).sum();
        let balance = self.reconciler.check_balance(header_total, detail_total);

        AuditPartition {
            currency,
            record_count: records.len(),
            header_total,
            details,
            balance,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
