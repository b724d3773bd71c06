//! # Zone Resolution
//!
//! Decides which enabled zones serve a postcode.
//!
//! ## Three-Way Match
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For the full postcode F and every candidate C, a stored pattern P      │
//! │  matches when any of these holds:                                       │
//! │                                                                         │
//! │   (a) P == C              "SW1"  == "SW1"        exact, any granularity │
//! │   (b) F starts with P     "CF101AA" starts "CF"  broad stored pattern   │
//! │   (c) P starts with C     "CF10" starts "CF"     broad customer input   │
//! │                                                                         │
//! │  Zones are registered at any granularity (area, district, full code)   │
//! │  and still match whichever granularity the customer typed.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rule (c) over-matches when zones use overlapping granularities: a
//! customer in "SW1A 1AA" also matches a zone registered as "SW19" through
//! the area candidate "SW". Each zone is still returned once.

use crate::postcode::PostcodeQuery;
use crate::types::{Zone, ZoneId};

/// A zone and the patterns registered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonePatterns {
    pub zone: Zone,
    pub patterns: Vec<String>,
}

/// True if `pattern` matches `key` under rule (a) or (c).
fn matches_key(pattern: &str, key: &str) -> bool {
    pattern == key || pattern.starts_with(key)
}

/// True if a stored pattern serves this postcode.
///
/// ## Example
/// ```rust
/// use delivery_core::postcode::PostcodeQuery;
/// use delivery_core::resolver::pattern_matches;
///
/// let query = PostcodeQuery::parse("SW1A 1AA");
/// assert!(pattern_matches("SW1", &query));
/// assert!(pattern_matches("SW1A1AA", &query));
/// assert!(!pattern_matches("CF", &query));
/// ```
pub fn pattern_matches(pattern: &str, query: &PostcodeQuery) -> bool {
    if pattern.is_empty() || query.is_empty() {
        return false;
    }

    let full = query.full();
    if full.starts_with(pattern) || matches_key(pattern, full) {
        return true;
    }

    query.candidates().iter().any(|candidate| matches_key(pattern, candidate))
}

/// Returns the enabled zones with at least one matching pattern.
///
/// Result is ordered by zone id ascending, each zone once.
pub fn resolve_zones<'a>(query: &PostcodeQuery, zones: &'a [ZonePatterns]) -> Vec<&'a Zone> {
    let mut matched: Vec<&Zone> = zones
        .iter()
        .filter(|entry| entry.zone.enabled)
        .filter(|entry| entry.patterns.iter().any(|p| pattern_matches(p, query)))
        .map(|entry| &entry.zone)
        .collect();

    matched.sort_by_key(|zone| zone.id);
    matched.dedup_by_key(|zone| zone.id);
    matched
}

/// Ids of the zones [`resolve_zones`] would return.
pub fn resolve_zone_ids(query: &PostcodeQuery, zones: &[ZonePatterns]) -> Vec<ZoneId> {
    resolve_zones(query, zones).into_iter().map(|zone| zone.id).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaxRate, VatSetting};
    use chrono::Utc;

    fn zone(id: i64, enabled: bool, patterns: &[&str]) -> ZonePatterns {
        let now = Utc::now();
        ZonePatterns {
            zone: Zone {
                id: ZoneId::new(id),
                name: format!("Zone {id}"),
                enabled,
                delivery_time: String::new(),
                description: String::new(),
                vat_setting: VatSetting::Global,
                custom_vat_rate: TaxRate::zero(),
                created_at: now,
                updated_at: now,
            },
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_rule_a_exact_candidate() {
        let query = PostcodeQuery::parse("SW1A 1AA");
        assert!(pattern_matches("SW1", &query));
        assert!(pattern_matches("SW1A", &query));
        assert!(pattern_matches("SW", &query));
    }

    #[test]
    fn test_rule_b_broad_stored_pattern() {
        let query = PostcodeQuery::parse("CF10 1AA");
        assert!(pattern_matches("CF", &query));
        assert!(pattern_matches("C", &query));
        assert!(pattern_matches("CF101A", &query));
    }

    #[test]
    fn test_rule_c_broad_customer_input() {
        let query = PostcodeQuery::parse("CF10");
        assert!(pattern_matches("CF101AA", &query));
        assert!(pattern_matches("CF10", &query));

        let area_only = PostcodeQuery::parse("CF");
        assert!(pattern_matches("CF10", &area_only));
        assert!(pattern_matches("CF", &area_only));
    }

    #[test]
    fn test_unrelated_patterns_do_not_match() {
        let query = PostcodeQuery::parse("CF10 1AA");
        assert!(!pattern_matches("B", &query));
        assert!(!pattern_matches("CF11", &query));
        assert!(!pattern_matches("", &query));
        assert!(!pattern_matches("CF", &PostcodeQuery::parse("")));
    }

    #[test]
    fn test_either_way_prefix_property() {
        // If P is a prefix of X or X is a prefix of P, the zone matches.
        let postcodes = ["SW1A 1AA", "CF10 1AA", "B33 8TH", "M1 1AE", "PA21"];
        let patterns = ["S", "SW", "SW1", "SW1A", "SW1A1AA", "CF", "CF10", "CF101AA", "B", "B33", "M", "M1", "PA", "PA21", "PA21XY"];
        for raw in postcodes {
            let query = PostcodeQuery::parse(raw);
            for pattern in patterns {
                let full = query.full();
                if full.starts_with(pattern) || pattern.starts_with(full) {
                    assert!(pattern_matches(pattern, &query), "{pattern} should match {raw}");
                }
            }
        }
    }

    #[test]
    fn test_overlapping_granularities_over_match() {
        let query = PostcodeQuery::parse("SW1A 1AA");
        // via candidate "SW" and rule (c)
        assert!(pattern_matches("SW19", &query));
    }

    #[test]
    fn test_resolve_filters_disabled_and_orders_by_id() {
        let zones = vec![
            zone(3, true, &["CF10"]),
            zone(1, true, &["CF", "CF10"]),
            zone(2, false, &["CF"]),
            zone(4, true, &["B", "M"]),
        ];

        let query = PostcodeQuery::parse("cf10 1aa");
        assert_eq!(resolve_zone_ids(&query, &zones), [ZoneId::new(1), ZoneId::new(3)]);

        let query = PostcodeQuery::parse("B1 1AA");
        assert_eq!(resolve_zone_ids(&query, &zones), [ZoneId::new(4)]);

        let query = PostcodeQuery::parse("ZZ9 9ZZ");
        assert!(resolve_zones(&query, &zones).is_empty());
    }

    #[test]
    fn test_resolve_returns_each_zone_once() {
        let zones = vec![zone(1, true, &["CF"]), zone(1, true, &["CF10"])];
        let query = PostcodeQuery::parse("CF10 1AA");
        assert_eq!(resolve_zones(&query, &zones).len(), 1);
    }
}
