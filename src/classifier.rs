// 🏷️ Type Classifier - site type per location code
//
// Known code            → type from the location master
// Well-formed, unknown  → NON_CINTAS (someone else's site)
// Blank or malformed    → UNKNOWN
//
// The NON_CINTAS / UNKNOWN split matters: SPECIAL matrix rules key on NON_CINTAS.

use crate::codes::{is_well_formed, normalize};
use crate::reference::{ReferenceStore, SiteType};

/// Classify a code against the reference store
pub fn classify(code: &str, store: &ReferenceStore) -> SiteType {
    let code = normalize(code);
    if code.is_empty() || !is_well_formed(&code) {
        return SiteType::Unknown;
    }

    match store.location(&code) {
        Some(location) => location.site_type,
        None => SiteType::NonCintas,
    }
}

/// Keep a type already present on the input row when it parses; otherwise classify.
///
/// "N.A." and unparseable labels (e.g. "THIRD PARTY") count as blank.
pub fn classify_or_keep(prefilled: &str, code: &str, store: &ReferenceStore) -> SiteType {
    SiteType::parse(prefilled)
        .filter(|site_type| *site_type != SiteType::Unknown)
        .unwrap_or_else(|| classify(code, store))
}
