// 📍 Address Cross-Reference
// Combined Address = FIRST_TOKEN(street) + FIRST_TOKEN(city) + STATE, uppercased, alphanumerics only.
//
// Matching is deliberately coarse: two sites sharing a street number, city and state
// collapse to the same key. The index keeps the first location per key.

use std::collections::HashMap;

use crate::reference::LocationRecord;

fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or("")
}

/// Build the composite matching key for an address
///
/// ```
/// use freight_accrual::address::combined_key;
/// assert_eq!(combined_key("6800 Cintas Blvd", "Mason", "OH"), "6800MASONOH");
/// ```
pub fn combined_key(address: &str, city: &str, state: &str) -> String {
    let raw = format!("{}{}{}", first_token(address), first_token(city), state);
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Combined Address → location code, built once per run from the location table
#[derive(Debug, Clone, Default)]
pub struct AddressIndex {
    by_key: HashMap<String, String>,
}

impl AddressIndex {
    pub fn new() -> Self {
        AddressIndex {
            by_key: HashMap::new(),
        }
    }

    /// Index every location under its own combined key; first location wins
    pub fn build<'a, I>(locations: I) -> Self
    where
        I: IntoIterator<Item = &'a LocationRecord>,
    {
        let mut index = AddressIndex::new();
        for location in locations {
            index.insert(&location.combined_key(), &location.code);
        }
        index
    }

    /// Insert unless the key is blank or already taken
    pub fn insert(&mut self, key: &str, code: &str) {
        if key.is_empty() || code.is_empty() {
            return;
        }
        self.by_key
            .entry(key.to_string())
            .or_insert_with(|| code.to_string());
    }

    /// Look up a code by combined key. Blank keys never match.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.by_key.get(key).map(|code| code.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
