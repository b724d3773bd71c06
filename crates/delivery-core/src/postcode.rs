//! # Postcode Normalization
//!
//! Turns customer-typed postcode text into the keys the zone resolver
//! matches against stored patterns.
//!
//! ## Candidate Keys
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Input: " sw1a 1aa "                                                    │
//! │       │                                                                 │
//! │       ▼  strip whitespace, uppercase                                    │
//! │  "SW1A1AA"                                                              │
//! │       │                                                                 │
//! │       ├── first 4 chars, outward-code shape  → "SW1A"                   │
//! │       ├── first 3 chars, letters+digits      → "SW1"                    │
//! │       ├── first 2 chars, letters+digits      → (no: "SW")               │
//! │       ├── leading letters                    → "SW"                     │
//! │       └── the whole string                   → "SW1A1AA"                │
//! │                                                                         │
//! │  Candidates: ["SW1A", "SW1", "SW", "SW1A1AA"]                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stored patterns and excluded prefixes go through the same whitespace and
//! case folding, so `"cf10 1aa"` typed by an administrator and `"CF101AA"`
//! typed by a customer compare equal.

use serde::Serialize;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::MAX_PATTERN_LENGTH;

// =============================================================================
// Normalization
// =============================================================================

/// Strips all whitespace and uppercases.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// A normalized postcode together with its candidate match keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PostcodeQuery {
    full: String,
    candidates: Vec<String>,
}

impl PostcodeQuery {
    /// Normalizes `raw` and derives its candidates.
    ///
    /// ## Example
    /// ```rust
    /// use delivery_core::postcode::PostcodeQuery;
    ///
    /// let query = PostcodeQuery::parse("CF10 1AA");
    /// assert_eq!(query.full(), "CF101AA");
    /// assert_eq!(query.candidates(), ["CF10", "CF1", "CF", "CF101AA"]);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let full = normalize(raw);
        let candidates = candidate_keys(&full);
        PostcodeQuery { full, candidates }
    }

    /// The whitespace-free, uppercase postcode.
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Candidate keys, most specific first, without duplicates.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// True when the customer supplied nothing usable.
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

/// Derives candidate keys from raw text.
///
/// ## Order
/// 1. first 4 chars if outward-code shaped (`A9`, `A99`, `A9A`, `AA9`, `AA99`, `AA9A`)
/// 2. first 3 chars, then first 2 chars, if letters-then-digits shaped
/// 3. the leading 1-2 letters
/// 4. the full normalized string
///
/// Empty input yields no candidates.
pub fn candidate_keys(raw: &str) -> Vec<String> {
    let full = normalize(raw);
    if full.is_empty() {
        return Vec::new();
    }

    let mut keys: Vec<String> = Vec::with_capacity(5);
    let mut push = |key: &str| {
        if !key.is_empty() && !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    };

    if let Some(first_four) = prefix_chars(&full, 4) {
        if is_outward_code(first_four) {
            push(first_four);
        }
    }

    for len in [3, 2] {
        if let Some(prefix) = prefix_chars(&full, len) {
            if is_area_district(prefix) {
                push(prefix);
            }
        }
    }

    push(leading_letters(&full));
    push(&full);

    keys
}

/// The first `len` characters, or `None` if the string is shorter.
fn prefix_chars(s: &str, len: usize) -> Option<&str> {
    match s.char_indices().nth(len) {
        Some((idx, _)) => Some(&s[..idx]),
        None if s.chars().count() == len => Some(s),
        None => None,
    }
}

/// Splits off a run of 1-2 ASCII uppercase letters, returning (letters, rest).
fn split_area(s: &str) -> Option<(&str, &str)> {
    let letters = s.chars().take(2).take_while(|c| c.is_ascii_uppercase()).count();
    if letters == 0 {
        None
    } else {
        Some(s.split_at(letters))
    }
}

/// Splits off a run of 1-2 ASCII digits, returning (digits, rest).
fn split_district(s: &str) -> Option<(&str, &str)> {
    let digits = s.chars().take(2).take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        None
    } else {
        Some(s.split_at(digits))
    }
}

/// `1-2 letters, 1-2 digits, optional trailing letter`, nothing else.
fn is_outward_code(s: &str) -> bool {
    let Some((_, rest)) = split_area(s) else {
        return false;
    };
    let Some((_, rest)) = split_district(rest) else {
        return false;
    };
    let mut tail = rest.chars();
    match (tail.next(), tail.next()) {
        (None, _) => true,
        (Some(c), None) => c.is_ascii_uppercase(),
        _ => false,
    }
}

/// `1-2 letters followed by 1-2 digits`, nothing else.
fn is_area_district(s: &str) -> bool {
    split_area(s)
        .and_then(|(_, rest)| split_district(rest))
        .is_some_and(|(_, rest)| rest.is_empty())
}

/// The leading 1-2 letters, or `""` if the string starts with a digit.
fn leading_letters(s: &str) -> &str {
    split_area(s).map(|(area, _)| area).unwrap_or("")
}

// =============================================================================
// Stored Patterns
// =============================================================================

/// Normalizes an administrator-entered pattern for storage.
///
/// ## Rules
/// - whitespace stripped, uppercased
/// - 1 to 10 characters
/// - letters and digits only
pub fn normalize_pattern(raw: &str) -> Result<String, ValidationError> {
    let pattern = normalize(raw);

    if pattern.is_empty() {
        return Err(ValidationError::Required {
            field: "postcode pattern".to_string(),
        });
    }

    if pattern.chars().count() > MAX_PATTERN_LENGTH {
        return Err(ValidationError::TooLong {
            field: format!("postcode pattern '{}'", pattern),
            max: MAX_PATTERN_LENGTH,
        });
    }

    if !pattern.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "postcode pattern".to_string(),
            reason: format!("'{}' must contain only letters and digits", pattern),
        });
    }

    Ok(pattern)
}

/// Splits a comma-separated administrator list, dropping empty entries.
///
/// ```rust
/// use delivery_core::postcode::split_list;
///
/// assert_eq!(split_list(" cf, b ,,M "), ["cf", "b", "M"]);
/// ```
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Excluded Postcodes
// =============================================================================

/// Prefixes the store never delivers to.
///
/// Checked against the normalized full postcode before zone resolution.
/// A hit removes every delivery option; collection is still offered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedPostcodes {
    prefixes: Vec<String>,
}

impl ExcludedPostcodes {
    /// Builds the list, normalizing entries and dropping empties/duplicates.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<String> = Vec::new();
        for entry in entries {
            let prefix = normalize(entry.as_ref());
            if !prefix.is_empty() && !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }
        ExcludedPostcodes { prefixes }
    }

    /// Returns the first excluded prefix that `full_postcode` starts with.
    pub fn matching_prefix(&self, full_postcode: &str) -> Option<&str> {
        if full_postcode.is_empty() {
            return None;
        }
        self.prefixes
            .iter()
            .find(|prefix| full_postcode.starts_with(prefix.as_str()))
            .map(String::as_str)
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_uk_postcode_candidates() {
        assert_eq!(candidate_keys("SW1A 1AA"), ["SW1A", "SW1", "SW", "SW1A1AA"]);
        assert_eq!(candidate_keys("cf10 1aa"), ["CF10", "CF1", "CF", "CF101AA"]);
        assert_eq!(candidate_keys("M1 1AE"), ["M11A", "M11", "M1", "M", "M11AE"]);
        // "B338" fails the outward shape: a digit cannot follow two district digits
        assert_eq!(candidate_keys("B33 8TH"), ["B33", "B3", "B", "B338TH"]);
    }

    #[test]
    fn test_area_and_district_only_inputs() {
        assert_eq!(candidate_keys("B"), ["B"]);
        assert_eq!(candidate_keys("cf"), ["CF"]);
        assert_eq!(candidate_keys("PA21"), ["PA21", "PA2", "PA"]);
        assert_eq!(candidate_keys("CF10"), ["CF10", "CF1", "CF"]);
    }

    #[test]
    fn test_empty_input_has_no_candidates() {
        assert!(candidate_keys("").is_empty());
        assert!(candidate_keys("   ").is_empty());
        assert!(PostcodeQuery::parse(" \t").is_empty());
    }

    #[test]
    fn test_unshaped_input_still_yields_full_string() {
        assert_eq!(candidate_keys("12345"), ["12345"]);
        assert_eq!(candidate_keys("ABC"), ["AB", "ABC"]);
    }

    #[test]
    fn test_first_candidate_is_idempotent() {
        for raw in ["CF10 1AA", "SW1A 1AA", "M1 1AE", "B", "PA21", "EC1A 1BB"] {
            let first = candidate_keys(raw)[0].clone();
            assert_eq!(candidate_keys(&first)[0], first, "input {raw}");
        }
    }

    #[test]
    fn test_outward_code_shape() {
        assert!(is_outward_code("SW1A"));
        assert!(is_outward_code("CF10"));
        assert!(is_outward_code("M1"));
        assert!(!is_outward_code("1AAA"));
        assert!(!is_outward_code("SW1AA"));
        assert!(!is_outward_code("ABC1"));
    }

    #[test]
    fn test_normalize_pattern_rules() {
        assert_eq!(normalize_pattern(" cf10 ").unwrap(), "CF10");
        assert_eq!(normalize_pattern("cf10 1aa").unwrap(), "CF101AA");
        assert!(normalize_pattern("").is_err());
        assert!(normalize_pattern("ABCDEFGHIJK").is_err());
        assert!(normalize_pattern("CF-10").is_err());
    }

    #[test]
    fn test_excluded_prefix_match() {
        let excluded = ExcludedPostcodes::new(["ab", " BT ", "", "AB"]);
        assert_eq!(excluded.prefixes(), ["AB", "BT"]);

        let query = PostcodeQuery::parse("AB12 3CD");
        assert_eq!(excluded.matching_prefix(query.full()), Some("AB"));
        assert_eq!(excluded.matching_prefix("CF101AA"), None);
        assert_eq!(excluded.matching_prefix(""), None);
    }
}
