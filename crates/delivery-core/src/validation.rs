//! # Validation Module
//!
//! Checks administrator input before anything reaches the configuration store.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Admin screen (external)                                      │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── validate_tiers      bounds per tier, then non-overlap             │
//! │  └── validate_zone_draft name, text lengths, VAT, patterns             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on pricing_tiers                                │
//! │  ├── UNIQUE (zone_id, pattern)                                         │
//! │  └── ON DELETE CASCADE                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use delivery_core::types::ProposedTier;
//! use delivery_core::validation::validate_tiers;
//!
//! let tiers: Vec<ProposedTier> = vec!["0:100:20".parse().unwrap(), "100.01:999999.99:10".parse().unwrap()];
//! assert_eq!(validate_tiers(&tiers).unwrap().len(), 2);
//!
//! let overlapping: Vec<ProposedTier> = vec!["0:100:20".parse().unwrap(), "100:200:10".parse().unwrap()];
//! assert!(validate_tiers(&overlapping).is_err());
//! ```

use crate::error::ValidationError;
use crate::postcode::normalize_pattern;
use crate::types::{PricingTier, ProposedTier, TaxRate, VatSetting, ZoneDraft};
use crate::MAX_ZONE_TEXT_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Tier Consistency
// =============================================================================

/// Validates a zone's complete replacement tier set.
///
/// ## Rules
/// 1. At least one tier.
/// 2. Each tier, in submission order, passes [`PricingTier::new`]; the first
///    failing tier is reported with its 1-based position.
/// 3. Sorted by `min_purchase`, every tier must end strictly before the next
///    one starts. Touching boundaries (`max == next.min`) count as overlap.
///
/// ## Returns
/// The tiers as validated records, sorted by `min_purchase`.
pub fn validate_tiers(proposed: &[ProposedTier]) -> ValidationResult<Vec<PricingTier>> {
    if proposed.is_empty() {
        return Err(ValidationError::NoTiers);
    }

    let mut tiers = proposed
        .iter()
        .enumerate()
        .map(|(index, tier)| {
            PricingTier::new(tier.min_purchase, tier.max_purchase, tier.base_cost).map_err(|reason| {
                ValidationError::InvalidTier {
                    position: index + 1,
                    range: tier.range_label(),
                    reason,
                }
            })
        })
        .collect::<ValidationResult<Vec<_>>>()?;

    tiers.sort_by_key(|tier| tier.min_purchase());

    if let Some(pair) = tiers
        .windows(2)
        .find(|pair| pair[0].max_purchase() >= pair[1].min_purchase())
    {
        return Err(ValidationError::OverlappingTiers {
            first: pair[0].range_label(),
            second: pair[1].range_label(),
        });
    }

    Ok(tiers)
}

// =============================================================================
// Zone Drafts
// =============================================================================

/// Validates a zone name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 255 characters
pub fn validate_zone_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_ZONE_TEXT_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_ZONE_TEXT_LENGTH,
        });
    }

    Ok(name.to_string())
}

/// Validates the free-text delivery time. Empty is allowed.
pub fn validate_delivery_time(delivery_time: &str) -> ValidationResult<String> {
    let delivery_time = delivery_time.trim();

    if delivery_time.chars().count() > MAX_ZONE_TEXT_LENGTH {
        return Err(ValidationError::TooLong {
            field: "delivery_time".to_string(),
            max: MAX_ZONE_TEXT_LENGTH,
        });
    }

    Ok(delivery_time.to_string())
}

/// Validates a VAT rate: 0% to 100% (0 to 10000 bps).
pub fn validate_vat_rate(rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "custom_vat_rate".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Normalizes a pattern list: each entry normalized, duplicates dropped,
/// first occurrence order kept. An empty list is allowed (the zone simply
/// matches nothing).
pub fn validate_patterns<S: AsRef<str>>(patterns: &[S]) -> ValidationResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(patterns.len());

    for raw in patterns {
        if raw.as_ref().trim().is_empty() {
            continue;
        }
        let pattern = normalize_pattern(raw.as_ref())?;
        if !normalized.contains(&pattern) {
            normalized.push(pattern);
        }
    }

    Ok(normalized)
}

/// Validates an administrator's zone draft and returns it normalized.
///
/// A `custom_vat_rate` on a zone that does not use [`VatSetting::Custom`]
/// is kept as entered; it is only consulted when the setting changes.
pub fn validate_zone_draft(draft: &ZoneDraft) -> ValidationResult<ZoneDraft> {
    let name = validate_zone_name(&draft.name)?;
    let delivery_time = validate_delivery_time(&draft.delivery_time)?;
    validate_vat_rate(draft.custom_vat_rate)?;
    let patterns = validate_patterns(&draft.patterns)?;

    Ok(ZoneDraft {
        name,
        enabled: draft.enabled,
        delivery_time,
        description: draft.description.trim().to_string(),
        vat_setting: draft.vat_setting,
        custom_vat_rate: draft.custom_vat_rate,
        patterns,
    })
}

/// True when a draft asks for a custom rate but leaves it at zero.
///
/// Not an error; such zones charge no VAT. Callers log it.
pub fn has_empty_custom_rate(draft: &ZoneDraft) -> bool {
    draft.vat_setting == VatSetting::Custom && draft.custom_vat_rate.is_zero()
}

// =============================================================================
// Unit Tests
// =============================================================================
