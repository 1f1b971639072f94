// 🧮 Coding Matrix - Rules as Data
// Ordered decision table choosing which party a shipment is charged to.
// Rules are tested highest priority first; the first rule whose conditions all
// hold wins. Nothing matched → the table's explicit fallback.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::codes::normalize;
use crate::error::{CodingError, Result};
use crate::reference::SiteType;

// ============================================================================
// RULE DEFINITION
// ============================================================================

/// Label written to the "Matrix Rule" column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixRule {
    Origin,
    Destination,
    Special,
    Unmatched,
}

impl MatrixRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixRule::Origin => "ORIGIN",
            MatrixRule::Destination => "DESTINATION",
            MatrixRule::Special => "SPECIAL",
            MatrixRule::Unmatched => "UNMATCHED",
        }
    }
}

/// Where the assigned location code comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum Assignment {
    /// Charge the consignor's code
    Origin,
    /// Charge the consignee's code
    Destination,
    /// Charge a fixed code (e.g. 0G59 for cross-border receipts)
    Special { code: String },
    /// Assign nothing
    Unmatched,
}

impl Assignment {
    pub fn rule(&self) -> MatrixRule {
        match self {
            Assignment::Origin => MatrixRule::Origin,
            Assignment::Destination => MatrixRule::Destination,
            Assignment::Special { .. } => MatrixRule::Special,
            Assignment::Unmatched => MatrixRule::Unmatched,
        }
    }
}

impl Default for Assignment {
    fn default() -> Self {
        Assignment::Unmatched
    }
}

/// One predicate over a shipment. Text comparisons ignore case and extra spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    OriginType { types: Vec<SiteType> },
    DestinationType { types: Vec<SiteType> },
    ConsignorContains { text: String },
    ConsigneeContains { text: String },
    /// Either party's free text contains `text`
    PartyContains { text: String },
    /// Consignor text contains none of `texts`
    ConsignorLacks { texts: Vec<String> },
    CarrierIs { name: String },
    ConsigneeCodeIn { codes: Vec<String> },
    OriginAddressStartsWith { prefix: String },
}

impl Condition {
    pub fn holds(&self, input: &MatrixInput) -> bool {
        match self {
            Condition::OriginType { types } => types.contains(&input.consignor_type),
            Condition::DestinationType { types } => types.contains(&input.consignee_type),
            Condition::ConsignorContains { text } => contains(input.consignor_text, text),
            Condition::ConsigneeContains { text } => contains(input.consignee_text, text),
            Condition::PartyContains { text } => {
                contains(input.consignor_text, text) || contains(input.consignee_text, text)
            }
            Condition::ConsignorLacks { texts } => {
                !texts.iter().any(|t| contains(input.consignor_text, t))
            }
            Condition::CarrierIs { name } => {
                let carrier = clean_text(input.carrier);
                !carrier.is_empty() && carrier == clean_text(name)
            }
            Condition::ConsigneeCodeIn { codes } => match input.consignee_code {
                Some(code) => codes.iter().any(|c| normalize(c) == code),
                None => false,
            },
            Condition::OriginAddressStartsWith { prefix } => {
                clean_text(input.origin_address).starts_with(&clean_text(prefix))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEntry {
    /// Rule ID for tracking
    pub id: String,

    /// All must hold; empty means "always"
    #[serde(default)]
    pub conditions: Vec<Condition>,

    pub assign: Assignment,

    /// Priority (higher = tested first)
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub description: Option<String>,
}

impl MatrixEntry {
    pub fn matches(&self, input: &MatrixInput) -> bool {
        self.conditions.iter().all(|c| c.holds(input))
    }
}

/// Uppercase, drop non-breaking/zero-width spaces, collapse whitespace
fn clean_text(value: &str) -> String {
    value
        .replace(['\u{00A0}', '\u{200B}'], " ")
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains(haystack: &str, needle: &str) -> bool {
    let needle = clean_text(needle);
    !needle.is_empty() && clean_text(haystack).contains(&needle)
}

// ============================================================================
// INPUT / DECISION
// ============================================================================

/// What the matrix sees of one shipment
#[derive(Debug, Clone, Copy)]
pub struct MatrixInput<'a> {
    pub consignor_type: SiteType,
    pub consignee_type: SiteType,
    pub consignor_code: Option<&'a str>,
    pub consignee_code: Option<&'a str>,
    pub consignor_text: &'a str,
    pub consignee_text: &'a str,
    pub carrier: &'a str,
    pub origin_address: &'a str,
}

impl<'a> MatrixInput<'a> {
    pub fn from_types(consignor_type: SiteType, consignee_type: SiteType) -> Self {
        MatrixInput {
            consignor_type,
            consignee_type,
            consignor_code: None,
            consignee_code: None,
            consignor_text: "",
            consignee_text: "",
            carrier: "",
            origin_address: "",
        }
    }

    /// Builder: normalized consignor/consignee codes
    pub fn with_codes(mut self, consignor: Option<&'a str>, consignee: Option<&'a str>) -> Self {
        self.consignor_code = consignor;
        self.consignee_code = consignee;
        self
    }

    /// Builder: free-text party names
    pub fn with_parties(mut self, consignor: &'a str, consignee: &'a str) -> Self {
        self.consignor_text = consignor;
        self.consignee_text = consignee;
        self
    }

    pub fn with_carrier(mut self, carrier: &'a str) -> Self {
        self.carrier = carrier;
        self
    }

    pub fn with_origin_address(mut self, address: &'a str) -> Self {
        self.origin_address = address;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixDecision {
    pub rule: MatrixRule,
    pub assigned_code: Option<String>,
    /// `None` when the fallback decided
    pub rule_id: Option<String>,
}

// ============================================================================
// MATRIX TABLE
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixTable {
    #[serde(default)]
    rules: Vec<MatrixEntry>,

    /// Outcome when no rule matches
    #[serde(default)]
    fallback: Assignment,
}

impl MatrixTable {
    /// Create a new empty table (everything falls back to UNMATCHED)
    pub fn new() -> Self {
        MatrixTable::default()
    }

    /// Load the table from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CodingError::MissingReferenceFile(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        MatrixTable::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let table: MatrixTable = serde_json::from_str(content)
            .map_err(|e| CodingError::MatrixRules(format!("failed to parse rules JSON: {}", e)))?;
        MatrixTable::from_rules(table.rules, table.fallback)
    }

    /// Create a table from a list of rules, validating special codes
    pub fn from_rules(rules: Vec<MatrixEntry>, fallback: Assignment) -> Result<Self> {
        let mut table = MatrixTable {
            rules: Vec::with_capacity(rules.len()),
            fallback: checked_assignment("fallback", fallback)?,
        };
        for rule in rules {
            table.add_rule(rule)?;
        }
        Ok(table)
    }

    /// Add a single rule, keeping priority order (ties keep insertion order)
    pub fn add_rule(&mut self, mut rule: MatrixEntry) -> Result<()> {
        rule.assign = checked_assignment(&rule.id, rule.assign)?;
        self.rules.push(rule);
        // Stable sort: equal priorities stay in file order
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    pub fn set_fallback(&mut self, fallback: Assignment) -> Result<()> {
        self.fallback = checked_assignment("fallback", fallback)?;
        Ok(())
    }

    pub fn fallback(&self) -> &Assignment {
        &self.fallback
    }

    pub fn rules(&self) -> &[MatrixEntry] {
        &self.rules
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

fn checked_assignment(rule_id: &str, assign: Assignment) -> Result<Assignment> {
    match assign {
        Assignment::Special { code } => {
            let code = normalize(&code);
            if code.is_empty() {
                return Err(CodingError::MatrixRules(format!(
                    "rule '{}': special assignment needs a code",
                    rule_id
                )));
            }
            Ok(Assignment::Special { code })
        }
        other => Ok(other),
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Evaluate the table for one shipment. Pure: same inputs, same decision.
pub fn resolve(table: &MatrixTable, input: &MatrixInput) -> MatrixDecision {
    let matched = table.rules.iter().find(|rule| rule.matches(input));

    let (assign, rule_id) = match matched {
        Some(rule) => (&rule.assign, Some(rule.id.clone())),
        None => (&table.fallback, None),
    };

    let assigned_code = match assign {
        Assignment::Origin => input.consignor_code.map(str::to_string),
        Assignment::Destination => input.consignee_code.map(str::to_string),
        Assignment::Special { code } => Some(code.clone()),
        Assignment::Unmatched => None,
    };

    MatrixDecision {
        rule: assign.rule(),
        assigned_code,
        rule_id,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn type_rule(id: &str, origin: SiteType, dest: SiteType, assign: Assignment) -> MatrixEntry {
        MatrixEntry {
            id: id.to_string(),
            conditions: vec![
                Condition::OriginType {
                    types: vec![origin],
                },
                Condition::DestinationType { types: vec![dest] },
            ],
            assign,
            priority: 0,
            description: None,
        }
    }

    fn basic_table() -> MatrixTable {
        MatrixTable::from_rules(
            vec![
                type_rule("us-dc-to-lc", SiteType::UsDc, SiteType::Lc, Assignment::Destination),
                type_rule(
                    "non-cintas-to-us-dc",
                    SiteType::NonCintas,
                    SiteType::UsDc,
                    Assignment::Special {
                        code: "0G59".to_string(),
                    },
                ),
                type_rule("lc-to-non-cintas", SiteType::Lc, SiteType::NonCintas, Assignment::Origin),
            ],
            Assignment::Unmatched,
        )
        .unwrap()
    }

    #[test]
    fn test_destination_rule() {
        let table = basic_table();
        let input = MatrixInput::from_types(SiteType::UsDc, SiteType::Lc)
            .with_codes(Some("0K35"), Some("024P"));

        let decision = resolve(&table, &input);
        assert_eq!(decision.rule, MatrixRule::Destination);
        assert_eq!(decision.assigned_code.as_deref(), Some("024P"));
        assert_eq!(decision.rule_id.as_deref(), Some("us-dc-to-lc"));
    }

    #[test]
    fn test_special_rule_assigns_constant() {
        let table = basic_table();
        let input = MatrixInput::from_types(SiteType::NonCintas, SiteType::UsDc)
            .with_codes(Some("9Z99"), Some("0K35"));

        let decision = resolve(&table, &input);
        assert_eq!(decision.rule, MatrixRule::Special);
        assert_eq!(decision.assigned_code.as_deref(), Some("0G59"));
    }

    #[test]
    fn test_origin_rule_with_blank_code() {
        let table = basic_table();
        let input = MatrixInput::from_types(SiteType::Lc, SiteType::NonCintas);

        let decision = resolve(&table, &input);
        assert_eq!(decision.rule, MatrixRule::Origin);
        assert_eq!(decision.assigned_code, None);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let table = basic_table();
        let input = MatrixInput::from_types(SiteType::UsDc, SiteType::Lc)
            .with_codes(Some("0K35"), Some("024P"));

        let first = resolve(&table, &input);
        for _ in 0..10 {
            assert_eq!(resolve(&table, &input), first);
        }
    }

    #[test]
    fn test_unmatched_falls_back() {
        let table = basic_table();
        let input = MatrixInput::from_types(SiteType::Mfg, SiteType::Fc)
            .with_codes(Some("0001"), Some("0002"));

        let decision = resolve(&table, &input);
        assert_eq!(decision.rule, MatrixRule::Unmatched);
        assert_eq!(decision.assigned_code, None);
        assert_eq!(decision.rule_id, None);
    }

    #[test]
    fn test_configurable_fallback() {
        let mut table = basic_table();
        table.set_fallback(Assignment::Destination).unwrap();
        let input = MatrixInput::from_types(SiteType::Mfg, SiteType::Fc)
            .with_codes(Some("0001"), Some("0002"));

        let decision = resolve(&table, &input);
        assert_eq!(decision.rule, MatrixRule::Destination);
        assert_eq!(decision.assigned_code.as_deref(), Some("0002"));
    }

    #[test]
    fn test_rule_priority() {
        let mut table = basic_table();

        // Carrier override beats the type rule
        table
            .add_rule(MatrixEntry {
                id: "omnitrans".to_string(),
                conditions: vec![Condition::CarrierIs {
                    name: "Omnitrans".to_string(),
                }],
                assign: Assignment::Destination,
                priority: 100,
                description: None,
            })
            .unwrap();

        let input = MatrixInput::from_types(SiteType::Lc, SiteType::NonCintas)
            .with_codes(Some("024P"), Some("9Z99"))
            .with_carrier("  OMNITRANS ");

        let decision = resolve(&table, &input);
        assert_eq!(decision.rule_id.as_deref(), Some("omnitrans"));
        assert_eq!(decision.assigned_code.as_deref(), Some("9Z99"));
    }

    #[test]
    fn test_equal_priority_keeps_order() {
        let table = MatrixTable::from_rules(
            vec![
                type_rule("first", SiteType::UsDc, SiteType::Lc, Assignment::Origin),
                type_rule("second", SiteType::UsDc, SiteType::Lc, Assignment::Destination),
            ],
            Assignment::Unmatched,
        )
        .unwrap();

        let decision = resolve(&table, &MatrixInput::from_types(SiteType::UsDc, SiteType::Lc));
        assert_eq!(decision.rule_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_text_conditions() {
        let input = MatrixInput::from_types(SiteType::NonCintas, SiteType::UsDc)
            .with_codes(None, Some("0851"))
            .with_parties("Matheson\u{00A0}Tri-Gas  FS", "Cintas 0851")
            .with_origin_address("570  Mathews Rd");

        assert!(Condition::ConsignorContains {
            text: "matheson tri-gas".to_string()
        }
        .holds(&input));
        assert!(Condition::PartyContains {
            text: "CINTAS 0851".to_string()
        }
        .holds(&input));
        assert!(Condition::ConsignorLacks {
            texts: vec!["0897".to_string(), "897".to_string()]
        }
        .holds(&input));
        assert!(Condition::ConsigneeCodeIn {
            codes: vec!["851".to_string()]
        }
        .holds(&input));
        assert!(Condition::OriginAddressStartsWith {
            prefix: "570 MATH".to_string()
        }
        .holds(&input));
        assert!(!Condition::CarrierIs {
            name: "".to_string()
        }
        .holds(&input));
        assert!(!Condition::ConsigneeContains {
            text: "".to_string()
        }
        .holds(&input));
    }

    #[test]
    fn test_from_json() {
        let table = MatrixTable::from_json(
            r#"{
                "fallback": { "to": "unmatched" },
                "rules": [
                    {
                        "id": "averitt",
                        "priority": 90,
                        "conditions": [{ "kind": "consignor_contains", "text": "AVERITT" }],
                        "assign": { "to": "special", "code": "4" }
                    },
                    {
                        "id": "us-dc-to-lc",
                        "conditions": [
                            { "kind": "origin_type", "types": ["US_DC"] },
                            { "kind": "destination_type", "types": ["LC"] }
                        ],
                        "assign": { "to": "destination" }
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(table.rule_count(), 2);
        assert_eq!(table.rules()[0].id, "averitt");
        assert_eq!(
            table.rules()[0].assign,
            Assignment::Special {
                code: "0004".to_string()
            }
        );
    }

    #[test]
    fn test_special_without_code_rejected() {
        let err = MatrixTable::from_json(
            r#"{ "rules": [ { "id": "bad", "assign": { "to": "special", "code": " " } } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CodingError::MatrixRules(_)));
    }

    #[test]
    fn test_shipped_matrix_parses() {
        let table = MatrixTable::from_json(include_str!("../config/matrix.json")).unwrap();
        assert!(table.rule_count() > 0);

        let decision = resolve(
            &table,
            &MatrixInput::from_types(SiteType::NonCintas, SiteType::UsDc)
                .with_codes(Some("9Z99"), Some("0A01")),
        );
        assert_eq!(decision.rule, MatrixRule::Special);
        assert_eq!(decision.assigned_code.as_deref(), Some("0G59"));

        let decision = resolve(
            &table,
            &MatrixInput::from_types(SiteType::UsDc, SiteType::Lc)
                .with_codes(Some("0A01"), Some("0B12")),
        );
        assert_eq!(decision.rule, MatrixRule::Destination);
        assert_eq!(decision.assigned_code.as_deref(), Some("0B12"));
        assert_eq!(decision.rule_id.as_deref(), Some("dc-to-location"));
    }

    #[test]
    fn test_shipped_matrix_has_no_shadowed_rules() {
        let table = MatrixTable::from_json(include_str!("../config/matrix.json")).unwrap();
        let rules = table.rules();

        // A later rule with the same conditions as an earlier one can never fire
        for (i, later) in rules.iter().enumerate() {
            for earlier in &rules[..i] {
                assert_ne!(
                    earlier.conditions, later.conditions,
                    "{} is shadowed by {}",
                    later.id, earlier.id
                );
            }
        }
    }
}
