// 🗂️ Reference Store - static lookup tables for one run
// Location master, profit/cost center mapping and the valid-code list,
// all keyed by normalized 4-character location code. Read-only after load.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::address::{combined_key, AddressIndex};
use crate::codes::{is_blank, normalize};
use crate::config::ReferencePaths;
use crate::error::{CodingError, Result};
use crate::table::Table;

// ============================================================================
// SITE TYPE
// ============================================================================

/// Site category of a location code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteType {
    UsDc,
    CaDc,
    Lc,
    Mfg,
    FasDc,
    Mm,
    Fl,
    Fc,
    /// Well-formed code that is not one of ours
    NonCintas,
    /// No code at all
    Unknown,
}

impl SiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::UsDc => "US_DC",
            SiteType::CaDc => "CA_DC",
            SiteType::Lc => "LC",
            SiteType::Mfg => "MFG",
            SiteType::FasDc => "FAS_DC",
            SiteType::Mm => "MM",
            SiteType::Fl => "FL",
            SiteType::Fc => "FC",
            SiteType::NonCintas => "NON_CINTAS",
            SiteType::Unknown => "UNKNOWN",
        }
    }

    /// Parse the spellings found in location tables and A3 extracts
    /// ("US DC", "us-dc", "NON-CINTAS", "NON CIN", ...). Blank and "N.A." yield `None`.
    pub fn parse(value: &str) -> Option<SiteType> {
        if is_blank(value) {
            return None;
        }

        let canonical: String = value
            .trim()
            .to_uppercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_' || c == '.')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        match canonical.as_str() {
            "US_DC" | "USDC" => Some(SiteType::UsDc),
            "CA_DC" | "CADC" => Some(SiteType::CaDc),
            "LC" => Some(SiteType::Lc),
            "MFG" => Some(SiteType::Mfg),
            "FAS_DC" | "FASDC" => Some(SiteType::FasDc),
            "MM" => Some(SiteType::Mm),
            "FL" => Some(SiteType::Fl),
            "FC" => Some(SiteType::Fc),
            "NON_CINTAS" | "NONCINTAS" | "NON_CIN" => Some(SiteType::NonCintas),
            "UNKNOWN" => Some(SiteType::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for SiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One row of the location master
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub code: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub site_type: SiteType,
    pub profit_center: Option<String>,
    pub cost_center: Option<String>,
}

impl LocationRecord {
    pub fn combined_key(&self) -> String {
        combined_key(&self.address, &self.city, &self.state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterCodes {
    pub profit_center: String,
    pub cost_center: String,
}

/// SHA-256 of a reference file as loaded, reported with every run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFingerprint {
    pub table: String,
    pub path: String,
    pub sha256: String,
    pub rows: usize,
}

// ============================================================================
// REFERENCE STORE
// ============================================================================

const LOCATION_TABLE: &str = "location table";
const CENTER_MAPPING: &str = "center mapping";
const VALID_CODES: &str = "valid codes";

const VALID_CODE_COLUMNS: &[&str] = &["Code", "Codes", "Loc Code", "Loc_Code", "Location Code"];

#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    /// Location master in file order; `location_index` points into it
    locations: Vec<LocationRecord>,
    location_index: HashMap<String, usize>,
    centers: HashMap<String, CenterCodes>,
    valid_codes: HashSet<String>,
    fingerprints: Vec<ReferenceFingerprint>,
}

impl ReferenceStore {
    /// Load all three tables. Any missing file or key column aborts the run.
    pub fn load(paths: &ReferencePaths) -> Result<Self> {
        let (location_table, location_fp) = read_reference(&paths.location_table, LOCATION_TABLE)?;
        let (center_table, center_fp) = read_reference(&paths.center_mapping, CENTER_MAPPING)?;
        let (codes_table, codes_fp) = read_reference(&paths.valid_codes, VALID_CODES)?;

        let locations = parse_locations(&location_table)?;
        let centers = parse_centers(&center_table)?;
        let valid_codes = parse_valid_codes(&codes_table)?;

        let mut store = ReferenceStore::from_parts(locations, centers, valid_codes);
        store.fingerprints = vec![location_fp, center_fp, codes_fp];

        info!(
            locations = store.locations.len(),
            centers = store.centers.len(),
            valid_codes = store.valid_codes.len(),
            "reference tables loaded"
        );
        Ok(store)
    }

    /// Build from in-memory parts. Codes are normalized; first occurrence wins.
    pub fn from_parts<L, C, V>(locations: L, centers: C, valid_codes: V) -> Self
    where
        L: IntoIterator<Item = LocationRecord>,
        C: IntoIterator<Item = (String, CenterCodes)>,
        V: IntoIterator<Item = String>,
    {
        let mut store = ReferenceStore::default();

        for mut location in locations {
            location.code = normalize(&location.code);
            if location.code.is_empty() || store.location_index.contains_key(&location.code) {
                continue;
            }
            store
                .location_index
                .insert(location.code.clone(), store.locations.len());
            store.locations.push(location);
        }

        // A mapping row without a profit center maps nothing
        for (code, center) in centers {
            let code = normalize(&code);
            if code.is_empty() || is_blank(&center.profit_center) {
                continue;
            }
            store.centers.entry(code).or_insert(center);
        }

        // Location rows carrying both centers fill gaps in the center mapping
        for location in &store.locations {
            if let (Some(profit_center), Some(cost_center)) =
                (&location.profit_center, &location.cost_center)
            {
                store
                    .centers
                    .entry(location.code.clone())
                    .or_insert_with(|| CenterCodes {
                        profit_center: profit_center.clone(),
                        cost_center: cost_center.clone(),
                    });
            }
        }

        store.valid_codes = valid_codes
            .into_iter()
            .map(|code| normalize(&code))
            .filter(|code| !code.is_empty())
            .collect();

        store
    }

    pub fn location(&self, code: &str) -> Option<&LocationRecord> {
        self.location_index
            .get(code)
            .map(|&i| &self.locations[i])
    }

    pub fn locations(&self) -> &[LocationRecord] {
        &self.locations
    }

    pub fn centers(&self, code: &str) -> Option<&CenterCodes> {
        self.centers.get(code)
    }

    pub fn is_valid_code(&self, code: &str) -> bool {
        self.valid_codes.contains(code)
    }

    pub fn valid_codes(&self) -> &HashSet<String> {
        &self.valid_codes
    }

    pub fn fingerprints(&self) -> &[ReferenceFingerprint] {
        &self.fingerprints
    }

    /// Combined Address → code index over the location master
    pub fn address_index(&self) -> AddressIndex {
        AddressIndex::build(&self.locations)
    }
}

// ============================================================================
// LOADERS
// ============================================================================

fn read_reference(path: &Path, table: &str) -> Result<(Table, ReferenceFingerprint)> {
    if !path.exists() {
        return Err(CodingError::MissingReferenceFile(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = format!("{:x}", hasher.finalize());

    let parsed = Table::read(path)?;
    let fingerprint = ReferenceFingerprint {
        table: table.to_string(),
        path: path.display().to_string(),
        sha256,
        rows: parsed.rows.len(),
    };
    Ok((parsed, fingerprint))
}

fn cell<'a>(row: &'a HashMap<String, String>, column: &str) -> &'a str {
    row.get(column).map(|v| v.trim()).unwrap_or("")
}

fn optional_center(row: &HashMap<String, String>, column: &str) -> Option<String> {
    let value = cell(row, column);
    if is_blank(value) {
        None
    } else {
        Some(value.to_uppercase())
    }
}

fn parse_locations(table: &Table) -> Result<Vec<LocationRecord>> {
    for column in ["Loc Code", "Loc_Address", "Loc_City", "Loc_ST", "Type_Code"] {
        table.require_column(LOCATION_TABLE, column)?;
    }

    let mut locations = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let code = normalize(cell(row, "Loc Code"));
        if code.is_empty() {
            continue;
        }

        let raw_type = cell(row, "Type_Code");
        let site_type = SiteType::parse(raw_type).unwrap_or_else(|| {
            warn!(code = %code, type_code = raw_type, "unrecognized site type in location table");
            SiteType::Unknown
        });

        locations.push(LocationRecord {
            code,
            address: cell(row, "Loc_Address").to_string(),
            city: cell(row, "Loc_City").to_string(),
            state: cell(row, "Loc_ST").to_string(),
            site_type,
            profit_center: optional_center(row, "Prof_Cntr"),
            cost_center: optional_center(row, "Cost_Cntr"),
        });
    }
    Ok(locations)
}

fn parse_centers(table: &Table) -> Result<Vec<(String, CenterCodes)>> {
    for column in ["Loc Code", "Prof_Cntr", "Cost_Cntr"] {
        table.require_column(CENTER_MAPPING, column)?;
    }

    Ok(table
        .rows
        .iter()
        .filter(|row| !is_blank(cell(row, "Loc Code")) && !is_blank(cell(row, "Prof_Cntr")))
        .map(|row| {
            (
                cell(row, "Loc Code").to_string(),
                CenterCodes {
                    profit_center: optional_center(row, "Prof_Cntr").unwrap_or_default(),
                    cost_center: optional_center(row, "Cost_Cntr").unwrap_or_default(),
                },
            )
        })
        .collect())
}

fn parse_valid_codes(table: &Table) -> Result<Vec<String>> {
    let column = VALID_CODE_COLUMNS
        .iter()
        .find(|c| table.has_column(c))
        .ok_or_else(|| CodingError::MissingColumn {
            table: VALID_CODES.to_string(),
            column: VALID_CODE_COLUMNS.join(" | "),
        })?;

    Ok(table
        .rows
        .iter()
        .map(|row| cell(row, column).to_string())
        .filter(|code| !is_blank(code))
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
