// 🔤 Location Codes - normalization and free-text extraction
// A location code is a 4-character uppercase alphanumeric identifier ("0K35", "024P").

use std::collections::HashSet;

/// Length every canonical location code is padded to
pub const CODE_LEN: usize = 4;

/// Placeholder strings spreadsheet exports leave in empty cells
const BLANK_MARKERS: &[&str] = &["NAN", "NONE", "NULL", "N.A.", "N/A", "#N/A", "<NA>"];

/// True when a cell carries no usable value
pub fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || BLANK_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// Canonicalize a raw code: drop whitespace, uppercase, left-pad with `0` to 4 chars,
/// and read a leading letter `O` as zero.
///
/// Longer inputs are returned uppercased but otherwise untouched, so they stay
/// malformed rather than being silently truncated. Blank input yields `""`.
///
/// ```
/// use freight_accrual::codes::normalize;
/// assert_eq!(normalize("24P"), "024P");
/// assert_eq!(normalize("ok35"), "0K35");
/// ```
pub fn normalize(raw: &str) -> String {
    if is_blank(raw) {
        return String::new();
    }

    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{200B}')
        .flat_map(|c| c.to_uppercase())
        .collect();

    let len = compact.chars().count();
    let padded = if len >= CODE_LEN {
        compact
    } else {
        format!("{}{}", "0".repeat(CODE_LEN - len), compact)
    };

    // Codes lead with the digit zero; a letter O there is a keying error
    match padded.strip_prefix('O') {
        Some(rest) if padded.len() == CODE_LEN => format!("0{}", rest),
        _ => padded,
    }
}

/// Normalize, returning `None` for blank input
pub fn normalize_opt(raw: &str) -> Option<String> {
    let code = normalize(raw);
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// A code is well-formed when it is exactly 4 ASCII alphanumerics after normalization
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Scan free text for the first whole token that is a valid location code.
///
/// Matching is case-insensitive and token based: "67" never matches inside "67N".
/// Tokens are tested left to right; the first member of `valid_codes` wins.
pub fn extract(text: &str, valid_codes: &HashSet<String>) -> Option<String> {
    if is_blank(text) {
        return None;
    }

    let upper = text.to_uppercase();
    upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() == CODE_LEN)
        .find(|token| valid_codes.contains(*token))
        .map(|token| token.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
