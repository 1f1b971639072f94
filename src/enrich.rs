// 💰 Financial Enricher - profit center, cost center, account number
//
// Account precedence (first match wins, order matters):
// 1. Profit center contains "G59"      → 621000
// 2. Consignee code == assigned code   → 621000
// 3. Otherwise                         → 621020

use serde::{Deserialize, Serialize};

use crate::reference::ReferenceStore;

/// Profit centers carrying this marker always book to inbound freight
pub const G59_MARKER: &str = "G59";

// ============================================================================
// ACCOUNT NUMBERS
// ============================================================================

/// The closed set of GL accounts the accrual writes. Always text on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountNumber {
    #[serde(rename = "621000")]
    InboundFreight,
    #[serde(rename = "621020")]
    OutboundFreight,
    #[serde(rename = "621010")]
    Duty,
    #[serde(rename = "203063")]
    GstPst,
    #[serde(rename = "203064")]
    Hst,
    #[serde(rename = "203065")]
    Qst,
}

impl AccountNumber {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountNumber::InboundFreight => "621000",
            AccountNumber::OutboundFreight => "621020",
            AccountNumber::Duty => "621010",
            AccountNumber::GstPst => "203063",
            AccountNumber::Hst => "203064",
            AccountNumber::Qst => "203065",
        }
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ENRICHMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialCoding {
    pub profit_center: Option<String>,
    pub cost_center: Option<String>,
    pub account_number: AccountNumber,
}

impl FinancialCoding {
    /// False when the assigned code had no usable profit center
    pub fn is_mapped(&self) -> bool {
        self.profit_center
            .as_deref()
            .map_or(false, |pc| !pc.trim().is_empty())
    }
}

/// Join the assigned code to its centers and pick the account
pub fn enrich(
    assigned: Option<&str>,
    consignee: Option<&str>,
    store: &ReferenceStore,
) -> FinancialCoding {
    let centers = assigned.and_then(|code| store.centers(code));
    let profit_center = centers.and_then(|c| non_blank(&c.profit_center));
    let cost_center = centers.and_then(|c| non_blank(&c.cost_center));

    let account_number = account_for(profit_center.as_deref(), assigned, consignee);

    FinancialCoding {
        profit_center,
        cost_center,
        account_number,
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Account precedence on its own, so the ordering can be tested directly
pub fn account_for(
    profit_center: Option<&str>,
    assigned: Option<&str>,
    consignee: Option<&str>,
) -> AccountNumber {
    if profit_center.map_or(false, |pc| pc.contains(G59_MARKER)) {
        return AccountNumber::InboundFreight;
    }

    match (assigned, consignee) {
        (Some(a), Some(c)) if a == c => AccountNumber::InboundFreight,
        _ => AccountNumber::OutboundFreight,
    }
}

// ============================================================================
// TESTS
// ============================================================================
