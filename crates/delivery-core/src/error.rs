//! # Error Types
//!
//! Domain-specific error types for delivery-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  delivery-core errors (this file)                                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── TierBoundError   - Why a single tier is malformed                 │
//! │                                                                         │
//! │  delivery-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  delivery-service errors                                               │
//! │  └── ServiceError     - What the admin/storefront caller sees          │
//! │                                                                         │
//! │  Flow: ValidationError → ServiceError ← DbError                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (zone id, tier range)
//! 3. Errors are enum variants, never String
//! 4. A postcode that matches nothing is NOT an error (see `quote`)

use thiserror::Error;

use crate::types::ZoneId;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Zone referenced by an administrator action does not exist.
    #[error("Zone not found: {0}")]
    ZoneNotFound(ZoneId),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Tier Bound Error
// =============================================================================

/// Why a single pricing tier was rejected.
///
/// Checked in declaration order; the first failing rule is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TierBoundError {
    #[error("Minimum purchase cannot be negative")]
    NegativeMinimum,

    #[error("Maximum purchase must be greater than 0")]
    NonPositiveMaximum,

    #[error("Minimum purchase must be less than maximum purchase")]
    MinimumNotBelowMaximum,

    #[error("Base cost cannot be negative")]
    NegativeCost,

    /// A bound or the cost is above [`crate::OPEN_ENDED_MAX_PURCHASE`].
    #[error("Amounts cannot exceed £999999.99")]
    AmountTooLarge,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before anything is written; a validation failure always means
/// nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., non-numeric amount, bad postcode characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// An empty tier set was submitted for a zone.
    #[error("At least one pricing tier is required")]
    NoTiers,

    /// A single tier breaks a bound rule.
    ///
    /// `position` is 1-based in submission order.
    #[error("Pricing tier {position} ({range}): {reason}")]
    InvalidTier {
        position: usize,
        range: String,
        reason: TierBoundError,
    },

    /// Two tiers share at least one subtotal value.
    ///
    /// ## Example
    /// ```text
    /// Pricing tiers cannot overlap. Check ranges: £0.00-£100.00 and £100.00-£200.00
    /// ```
    #[error("Pricing tiers cannot overlap. Check ranges: {first} and {second}")]
    OverlappingTiers { first: String, second: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_error_messages() {
        let err = ValidationError::InvalidTier {
            position: 2,
            range: "£50.00-£10.00".to_string(),
            reason: TierBoundError::MinimumNotBelowMaximum,
        };
        assert_eq!(
            err.to_string(),
            "Pricing tier 2 (£50.00-£10.00): Minimum purchase must be less than maximum purchase"
        );

        let err = ValidationError::OverlappingTiers {
            first: "£0.00-£100.00".to_string(),
            second: "£100.00-£200.00".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Pricing tiers cannot overlap. Check ranges: £0.00-£100.00 and £100.00-£200.00"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");
        assert_eq!(ValidationError::NoTiers.to_string(), "At least one pricing tier is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::NoTiers.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(CoreError::ZoneNotFound(ZoneId::new(7)).to_string(), "Zone not found: 7");
    }
}
