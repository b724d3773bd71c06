//! # delivery-core: Pure Delivery Pricing Logic
//!
//! Postcode-to-zone resolution, tier selection, VAT, and the validators
//! that guard configuration writes. No I/O lives here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Delivery Pricing Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Storefront checkout / admin screens (external)       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                delivery-service (DeliveryService)               │   │
//! │  │   resolve_delivery_options, validate_and_save_tiers, ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ delivery-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   postcode ──► resolver ──► pricing ──► vat ──► quote           │   │
//! │  │                                  ▲                              │   │
//! │  │                             validation                          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              delivery-db (SQLite configuration store)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer pence
//! - [`types`] - Zone, PricingTier, VatSetting, admin drafts
//! - [`postcode`] - Normalizer, stored pattern rules, excluded prefixes
//! - [`resolver`] - Three-way pattern match over enabled zones
//! - [`pricing`] - Tier selection for a subtotal
//! - [`vat`] - Effective rate per zone and the tax-rate provider seam
//! - [`quote`] - Delivery options and the quote returned to the storefront
//! - [`validation`] - Tier set and zone draft validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use delivery_core::postcode::PostcodeQuery;
//! use delivery_core::resolver::pattern_matches;
//!
//! let query = PostcodeQuery::parse("CF10 1AA");
//! assert!(pattern_matches("CF", &query));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod postcode;
pub mod pricing;
pub mod quote;
pub mod resolver;
pub mod types;
pub mod validation;
pub mod vat;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, TierBoundError, ValidationError};
pub use money::Money;
pub use postcode::{ExcludedPostcodes, PostcodeQuery};
pub use quote::{DeliveryOption, DeliveryOptionType, DeliveryQuote, QuoteStatus};
pub use resolver::ZonePatterns;
pub use types::*;
pub use vat::{StaticTaxRates, TaxClass, TaxRateProvider};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest stored postcode pattern (a full postcode without its space).
pub const MAX_PATTERN_LENGTH: usize = 10;

/// Longest zone name and delivery time text.
pub const MAX_ZONE_TEXT_LENGTH: usize = 255;

/// Upper bound used for "and above" tiers: £999,999.99.
pub const OPEN_ENDED_MAX_PURCHASE: Money = Money::from_pence(99_999_999);

/// Cost of the single tier a newly created zone starts with.
pub const DEFAULT_TIER_COST: Money = Money::from_pence(2000);

/// Option id of the store collection option.
pub const COLLECTION_OPTION_ID: &str = "collection";

/// Delivery option ids are this prefix followed by the zone id.
pub const ZONE_OPTION_PREFIX: &str = "zone_";
