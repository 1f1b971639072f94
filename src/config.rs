// ⚙️ Configuration - coding.toml
// Reference file locations, input column names, and the two settings the
// business has to decide per deployment (accuracy source, audit batch column).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CodingError, Result};

// ============================================================================
// TOP-LEVEL CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodingConfig {
    pub references: ReferencePaths,
    pub matrix: MatrixConfig,
    pub columns: ColumnMap,
    pub accuracy: AccuracyConfig,
    pub audit: AuditConfig,
}

impl CodingConfig {
    /// Load from TOML. Relative paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CodingError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = CodingConfig::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CodingError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            CodingConfig::from_file(path)
        } else {
            Ok(CodingConfig::default())
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.references.location_table);
        resolve(&mut self.references.center_mapping);
        resolve(&mut self.references.valid_codes);
        resolve(&mut self.matrix.rules);
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReferencePaths {
    pub location_table: PathBuf,
    pub center_mapping: PathBuf,
    pub valid_codes: PathBuf,
}

impl Default for ReferencePaths {
    fn default() -> Self {
        ReferencePaths {
            location_table: PathBuf::from("reference/location_table.csv"),
            center_mapping: PathBuf::from("reference/center_mapping.csv"),
            valid_codes: PathBuf::from("reference/location_codes.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// JSON file holding the ordered decision table
    pub rules: PathBuf,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        MatrixConfig {
            rules: PathBuf::from("config/matrix.json"),
        }
    }
}

/// Input column names; defaults follow the A3 workbook headers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub consignor: String,
    pub consignee: String,
    pub consignor_code: String,
    pub consignee_code: String,
    pub origin_type_code: String,
    pub dest_type_code: String,
    pub consignor_type: String,
    pub consignee_type: String,
    pub origin_address: String,
    pub origin_city: String,
    pub origin_state: String,
    pub dest_address: String,
    pub dest_city: String,
    pub dest_state: String,
    pub carrier: String,
    pub invoice_number: String,
    pub paid_amount: String,
    pub currency: String,
    pub duty: String,
    pub gst_pst: String,
    pub hst: String,
    pub qst: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            consignor: "Consignor".to_string(),
            consignee: "Consignee".to_string(),
            consignor_code: "Consignor Code".to_string(),
            consignee_code: "Consignee Code".to_string(),
            origin_type_code: "Origin Type Code".to_string(),
            dest_type_code: "Dest Type Code".to_string(),
            consignor_type: "Consignor Type".to_string(),
            consignee_type: "Consignee Type".to_string(),
            // Triple "s" is how the A3 extract spells it
            origin_address: "Origin Addresss".to_string(),
            origin_city: "Origin City".to_string(),
            origin_state: "Origin State Code".to_string(),
            dest_address: "Dest Address1".to_string(),
            dest_city: "Dest City".to_string(),
            dest_state: "Dest State Code".to_string(),
            carrier: "Carrier Name".to_string(),
            invoice_number: "Invoice Number".to_string(),
            paid_amount: "Paid Amount".to_string(),
            currency: "Currency".to_string(),
            duty: "Duty".to_string(),
            gst_pst: "GST/PST".to_string(),
            hst: "HST".to_string(),
            qst: "QST".to_string(),
        }
    }
}

/// Where the expected profit center for Automation Accuracy comes from.
/// Unset means nothing can be verified and every record scores 0.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccuracyConfig {
    pub expected_profit_center_column: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Column holding the audit run/batch number used by `--batch`
    pub batch_column: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            batch_column: "Run Number".to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = CodingConfig::from_toml("").unwrap();
        assert_eq!(config.columns.origin_address, "Origin Addresss");
        assert_eq!(config.matrix.rules, PathBuf::from("config/matrix.json"));
        assert!(config.accuracy.expected_profit_center_column.is_none());
    }

    #[test]
    fn test_partial_override() {
        let config = CodingConfig::from_toml(
            r#"
            [columns]
            paid_amount = "Paid"

            [accuracy]
            expected_profit_center_column = "Profit Center"
            "#,
        )
        .unwrap();

        assert_eq!(config.columns.paid_amount, "Paid");
        assert_eq!(config.columns.invoice_number, "Invoice Number");
        assert_eq!(
            config.accuracy.expected_profit_center_column.as_deref(),
            Some("Profit Center")
        );
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coding.toml");
        fs::write(
            &path,
            "[references]\nlocation_table = \"refs/loc.csv\"\n[matrix]\nrules = \"/abs/matrix.json\"\n",
        )
        .unwrap();

        let config = CodingConfig::from_file(&path).unwrap();
        assert_eq!(config.references.location_table, dir.path().join("refs/loc.csv"));
        assert_eq!(config.matrix.rules, PathBuf::from("/abs/matrix.json"));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = CodingConfig::from_toml("[columns\n").unwrap_err();
        assert!(matches!(err, CodingError::Config(_)));
    }
}
