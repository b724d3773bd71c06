//! # Domain Types
//!
//! Core configuration records for delivery pricing.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Zone       │   │ PostcodePattern │   │   PricingTier   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (ZoneId)    │◄──│  zone_id        │   │  min_purchase   │       │
//! │  │  name, enabled  │   │  pattern "CF10" │   │  max_purchase   │       │
//! │  │  vat_setting    │   └─────────────────┘   │  base_cost      │       │
//! │  └─────────────────┘                          └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   VatSetting    │   │   ZoneDraft     │       │
//! │  │  bps (u32)      │   │  Global         │   │  admin input    │       │
//! │  │  2000 = 20%     │   │  Custom / None  │   │  (unvalidated)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Zones own their patterns and tiers; the database cascades deletes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{TierBoundError, ValidationError};
use crate::money::{parse_hundredths, Money};
use crate::OPEN_ENDED_MAX_PURCHASE;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 2000 bps = 20% (UK standard VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a stored value that may be zero or negative.
    ///
    /// Anything `<= 0` becomes a zero rate so tax can never go negative.
    pub fn from_stored_bps(bps: i64) -> Self {
        if bps <= 0 {
            TaxRate::zero()
        } else {
            TaxRate(u32::try_from(bps).unwrap_or(u32::MAX))
        }
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Parses a percentage such as `"20"` or `"17.5"`.
impl FromStr for TaxRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed);

        let bps = parse_hundredths(number).ok_or_else(|| ValidationError::InvalidFormat {
            field: "vat_rate".to_string(),
            reason: format!("'{}' is not a percentage with at most 2 decimal places", trimmed),
        })?;

        u32::try_from(bps)
            .map(TaxRate)
            .map_err(|_| ValidationError::OutOfRange {
                field: "vat_rate".to_string(),
                min: 0,
                max: 10000,
            })
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Zone Identity
// =============================================================================

/// Stable identifier of a delivery zone (database row id).
///
/// Zone ids are assigned in creation order, so ordering by id gives the
/// deterministic result order the resolver promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct ZoneId(i64);

impl ZoneId {
    #[inline]
    pub const fn new(id: i64) -> Self {
        ZoneId(id)
    }

    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ZoneId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(ZoneId)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "zone_id".to_string(),
                reason: format!("'{}' is not a positive integer", s.trim()),
            })
    }
}

// =============================================================================
// VAT Setting
// =============================================================================

/// Which VAT policy a zone applies to its delivery cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum VatSetting {
    /// Use the store-wide rate from the tax-rate provider.
    #[default]
    Global,
    /// Use the zone's own `custom_vat_rate`.
    Custom,
    /// No VAT on this zone's delivery.
    None,
}

impl VatSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            VatSetting::Global => "global",
            VatSetting::Custom => "custom",
            VatSetting::None => "none",
        }
    }
}

impl FromStr for VatSetting {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(VatSetting::Global),
            "custom" => Ok(VatSetting::Custom),
            "none" => Ok(VatSetting::None),
            _ => Err(ValidationError::NotAllowed {
                field: "vat_setting".to_string(),
                allowed: vec!["global".to_string(), "custom".to_string(), "none".to_string()],
            }),
        }
    }
}

// =============================================================================
// Zone
// =============================================================================

/// An administrator-defined delivery region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Zone {
    pub id: ZoneId,

    /// Display name, shown to the customer as the option label.
    pub name: String,

    /// Disabled zones never match a postcode.
    pub enabled: bool,

    /// Free text, e.g. "1-2 working days".
    pub delivery_time: String,

    pub description: String,

    pub vat_setting: VatSetting,

    /// Only consulted when `vat_setting` is [`VatSetting::Custom`].
    pub custom_vat_rate: TaxRate,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A stored postcode pattern (area, district, or full postcode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PostcodePattern {
    pub zone_id: ZoneId,
    pub pattern: String,
}

// =============================================================================
// Pricing Tier
// =============================================================================

/// A subtotal range mapped to a fixed pre-tax delivery cost.
///
/// ## Invariants
/// Enforced by [`PricingTier::new`], the only constructor:
/// - `min_purchase >= 0`
/// - `max_purchase > 0`
/// - `min_purchase < max_purchase`
/// - `base_cost >= 0`
/// - no amount above [`OPEN_ENDED_MAX_PURCHASE`]
///
/// Non-overlap is a property of a zone's whole tier set and is checked by
/// [`crate::validation::validate_tiers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PricingTier {
    min_purchase: Money,
    max_purchase: Money,
    base_cost: Money,
}

impl PricingTier {
    /// Creates a tier, checking bounds in order (first failure wins).
    pub fn new(min_purchase: Money, max_purchase: Money, base_cost: Money) -> Result<Self, TierBoundError> {
        if min_purchase.is_negative() {
            return Err(TierBoundError::NegativeMinimum);
        }
        if !max_purchase.is_positive() {
            return Err(TierBoundError::NonPositiveMaximum);
        }
        if min_purchase >= max_purchase {
            return Err(TierBoundError::MinimumNotBelowMaximum);
        }
        if base_cost.is_negative() {
            return Err(TierBoundError::NegativeCost);
        }
        if max_purchase > OPEN_ENDED_MAX_PURCHASE || base_cost > OPEN_ENDED_MAX_PURCHASE {
            return Err(TierBoundError::AmountTooLarge);
        }

        Ok(PricingTier {
            min_purchase,
            max_purchase,
            base_cost,
        })
    }

    /// The tier a new zone starts with: every basket, flat £20.00.
    pub fn open_ended(base_cost: Money) -> Result<Self, TierBoundError> {
        PricingTier::new(Money::zero(), OPEN_ENDED_MAX_PURCHASE, base_cost)
    }

    #[inline]
    pub fn min_purchase(&self) -> Money {
        self.min_purchase
    }

    #[inline]
    pub fn max_purchase(&self) -> Money {
        self.max_purchase
    }

    #[inline]
    pub fn base_cost(&self) -> Money {
        self.base_cost
    }

    /// Both bounds inclusive.
    #[inline]
    pub fn covers(&self, subtotal: Money) -> bool {
        self.min_purchase <= subtotal && subtotal <= self.max_purchase
    }

    /// `£0.00-£100.00`, used in validation messages and option labels.
    pub fn range_label(&self) -> String {
        format!("{}-{}", self.min_purchase, self.max_purchase)
    }
}

/// A tier as submitted by an administrator, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProposedTier {
    pub min_purchase: Money,
    pub max_purchase: Money,
    pub base_cost: Money,
}

impl ProposedTier {
    pub fn new(min_purchase: Money, max_purchase: Money, base_cost: Money) -> Self {
        ProposedTier {
            min_purchase,
            max_purchase,
            base_cost,
        }
    }

    pub fn range_label(&self) -> String {
        format!("{}-{}", self.min_purchase, self.max_purchase)
    }
}

/// Parses `min:max:cost`, e.g. `0:100:20` or `100.01:999999.99:10`.
impl FromStr for ProposedTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(ValidationError::InvalidFormat {
                field: "pricing_tier".to_string(),
                reason: format!("'{}' must be written as min:max:cost", s),
            });
        }

        Ok(ProposedTier {
            min_purchase: parts[0].parse()?,
            max_purchase: parts[1].parse()?,
            base_cost: parts[2].parse()?,
        })
    }
}

impl From<PricingTier> for ProposedTier {
    fn from(tier: PricingTier) -> Self {
        ProposedTier::new(tier.min_purchase, tier.max_purchase, tier.base_cost)
    }
}

// =============================================================================
// Admin Input
// =============================================================================

/// One administrator "save zone" action, before validation.
///
/// `patterns` is raw input; see [`crate::validation::validate_zone_draft`]
/// for the normalization applied before anything is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ZoneDraft {
    pub name: String,
    pub enabled: bool,
    #[serde(default)]
    pub delivery_time: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vat_setting: VatSetting,
    #[serde(default)]
    pub custom_vat_rate: TaxRate,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl ZoneDraft {
    /// A minimal enabled draft with global VAT.
    pub fn new(name: impl Into<String>, patterns: Vec<String>) -> Self {
        ZoneDraft {
            name: name.into(),
            enabled: true,
            delivery_time: String::new(),
            description: String::new(),
            vat_setting: VatSetting::Global,
            custom_vat_rate: TaxRate::zero(),
            patterns,
        }
    }
}

/// A zone with everything it owns, for the administrator view.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ZoneDetails {
    pub zone: Zone,
    pub patterns: Vec<String>,
    pub tiers: Vec<PricingTier>,
}

// =============================================================================
// Collection Settings
// =============================================================================

/// Store-wide "collect from store" option, independent of postcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CollectionSettings {
    pub enabled: bool,
    pub name: String,
    pub description: String,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        CollectionSettings {
            enabled: true,
            name: "Collection from Store".to_string(),
            description: "Collect your order from our store location".to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pounds(p: i64) -> Money {
        Money::from_major_minor(p, 0)
    }

    #[test]
    fn test_tax_rate_parse_percentage() {
        assert_eq!("20".parse::<TaxRate>().unwrap().bps(), 2000);
        assert_eq!("17.5".parse::<TaxRate>().unwrap().bps(), 1750);
        assert_eq!("5%".parse::<TaxRate>().unwrap().bps(), 500);
        assert!("-1".parse::<TaxRate>().is_err());
        assert!("abc".parse::<TaxRate>().is_err());
        assert_eq!(TaxRate::from_bps(1750).to_string(), "17.50%");
    }

    #[test]
    fn test_tax_rate_from_stored_clamps_non_positive() {
        assert!(TaxRate::from_stored_bps(0).is_zero());
        assert!(TaxRate::from_stored_bps(-500).is_zero());
        assert_eq!(TaxRate::from_stored_bps(2000).bps(), 2000);
    }

    #[test]
    fn test_vat_setting_round_trip_names() {
        for setting in [VatSetting::Global, VatSetting::Custom, VatSetting::None] {
            assert_eq!(setting.as_str().parse::<VatSetting>().unwrap(), setting);
        }
        assert_eq!(" Custom ".parse::<VatSetting>().unwrap(), VatSetting::Custom);
        assert!("reduced".parse::<VatSetting>().is_err());
        assert_eq!(VatSetting::default(), VatSetting::Global);
    }

    #[test]
    fn test_zone_id_parse() {
        assert_eq!("42".parse::<ZoneId>().unwrap(), ZoneId::new(42));
        assert!("0".parse::<ZoneId>().is_err());
        assert!("zone".parse::<ZoneId>().is_err());
    }

    #[test]
    fn test_pricing_tier_constructor_checks_in_order() {
        assert_eq!(
            PricingTier::new(Money::from_pence(-1), Money::zero(), Money::from_pence(-1)),
            Err(TierBoundError::NegativeMinimum)
        );
        assert_eq!(
            PricingTier::new(Money::zero(), Money::zero(), pounds(1)),
            Err(TierBoundError::NonPositiveMaximum)
        );
        assert_eq!(
            PricingTier::new(pounds(100), pounds(100), pounds(1)),
            Err(TierBoundError::MinimumNotBelowMaximum)
        );
        assert_eq!(
            PricingTier::new(pounds(0), pounds(100), Money::from_pence(-1)),
            Err(TierBoundError::NegativeCost)
        );
        assert_eq!(
            PricingTier::new(pounds(0), pounds(100), Money::from_pence(9_000_000_000_000_000_000)),
            Err(TierBoundError::AmountTooLarge)
        );
        assert_eq!(
            PricingTier::new(pounds(0), Money::from_pence(100_000_000), pounds(1)),
            Err(TierBoundError::AmountTooLarge)
        );
        assert!(PricingTier::new(pounds(0), pounds(100), Money::zero()).is_ok());
        assert!(PricingTier::new(pounds(0), OPEN_ENDED_MAX_PURCHASE, OPEN_ENDED_MAX_PURCHASE).is_ok());
    }

    #[test]
    fn test_pricing_tier_covers_inclusive_bounds() {
        let tier = PricingTier::new(pounds(0), pounds(100), pounds(20)).unwrap();
        assert!(tier.covers(Money::zero()));
        assert!(tier.covers(pounds(100)));
        assert!(!tier.covers(Money::from_pence(10001)));
        assert_eq!(tier.range_label(), "£0.00-£100.00");
    }

    #[test]
    fn test_open_ended_tier() {
        let tier = PricingTier::open_ended(pounds(20)).unwrap();
        assert_eq!(tier.max_purchase().pence(), 99_999_999);
        assert!(tier.covers(pounds(5000)));
    }

    #[test]
    fn test_proposed_tier_parse() {
        let tier: ProposedTier = "100.01:999999.99:10".parse().unwrap();
        assert_eq!(tier.min_purchase.pence(), 10001);
        assert_eq!(tier.max_purchase.pence(), 99_999_999);
        assert_eq!(tier.base_cost.pence(), 1000);

        assert!("0:100".parse::<ProposedTier>().is_err());
        assert!("0:x:1".parse::<ProposedTier>().is_err());
    }

    #[test]
    fn test_collection_defaults() {
        let collection = CollectionSettings::default();
        assert!(collection.enabled);
        assert_eq!(collection.name, "Collection from Store");
    }
}
