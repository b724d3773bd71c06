//! # VAT Calculator
//!
//! Derives the rate applied to a zone's delivery cost.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  vat_setting                                                            │
//! │    none   ──► 0                                                         │
//! │    custom ──► zone.custom_vat_rate (0 when stored rate <= 0)            │
//! │    global ──► TaxRateProvider, classes tried in order:                  │
//! │                 Shipping, Standard  → first configured rate, else 0     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The provider is the seam to whatever tax configuration the store uses.
//! Lookups are synchronous; a provider backed by remote data owns its own
//! caching and timeouts.

use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{TaxRate, VatSetting, Zone};

// =============================================================================
// Tax Rate Provider
// =============================================================================

/// Tax class looked up for global-VAT zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxClass {
    /// Rate configured specifically for shipping charges.
    Shipping,
    /// The store's standard rate.
    Standard,
}

impl TaxClass {
    /// Lookup order for global-VAT zones.
    pub const LOOKUP_ORDER: [TaxClass; 2] = [TaxClass::Shipping, TaxClass::Standard];
}

/// Store-wide tax rate lookup.
///
/// `None` means the store has no rate configured for that class. A
/// configured 0% is a rate like any other and stops the lookup.
pub trait TaxRateProvider: Send + Sync {
    fn rate_for(&self, class: TaxClass) -> Option<TaxRate>;
}

/// Fixed rates, usually loaded from service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticTaxRates {
    pub standard: Option<TaxRate>,
    pub shipping: Option<TaxRate>,
}

impl StaticTaxRates {
    /// Only a standard rate (shipping falls back to it).
    pub fn standard(rate: TaxRate) -> Self {
        StaticTaxRates {
            standard: Some(rate),
            shipping: None,
        }
    }
}

impl TaxRateProvider for StaticTaxRates {
    fn rate_for(&self, class: TaxClass) -> Option<TaxRate> {
        match class {
            TaxClass::Shipping => self.shipping,
            TaxClass::Standard => self.standard,
        }
    }
}

// =============================================================================
// Effective Rate
// =============================================================================

/// The rate applied to `zone`'s delivery cost.
pub fn effective_rate(zone: &Zone, provider: &dyn TaxRateProvider) -> TaxRate {
    match zone.vat_setting {
        VatSetting::None => TaxRate::zero(),
        VatSetting::Custom => zone.custom_vat_rate,
        VatSetting::Global => TaxClass::LOOKUP_ORDER
            .iter()
            .find_map(|class| provider.rate_for(*class))
            .unwrap_or_else(TaxRate::zero),
    }
}

/// Costs of one option, before and after VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct VatBreakdown {
    pub cost_ex_vat: Money,
    pub vat_amount: Money,
    pub cost_inc_vat: Money,
    pub rate: TaxRate,
}

impl VatBreakdown {
    /// Applies `rate` to a pre-tax cost.
    pub fn apply(cost_ex_vat: Money, rate: TaxRate) -> Self {
        let vat_amount = cost_ex_vat.calculate_tax(rate);
        VatBreakdown {
            cost_ex_vat,
            vat_amount,
            cost_inc_vat: cost_ex_vat.saturating_add(vat_amount),
            rate,
        }
    }

    /// All zero; used for collection.
    pub fn free() -> Self {
        VatBreakdown::apply(Money::zero(), TaxRate::zero())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZoneId;
    use chrono::Utc;

    fn zone(vat_setting: VatSetting, custom_bps: u32) -> Zone {
        let now = Utc::now();
        Zone {
            id: ZoneId::new(1),
            name: "Zone 1 - Local".to_string(),
            enabled: true,
            delivery_time: "1-2 working days".to_string(),
            description: String::new(),
            vat_setting,
            custom_vat_rate: TaxRate::from_bps(custom_bps),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_custom_rate_breakdown() {
        let rate = effective_rate(&zone(VatSetting::Custom, 2000), &StaticTaxRates::default());
        let costs = VatBreakdown::apply(Money::from_pence(1000), rate);
        assert_eq!(costs.vat_amount.pence(), 200);
        assert_eq!(costs.cost_inc_vat.pence(), 1200);
    }

    #[test]
    fn test_none_is_zero_even_with_provider_rate() {
        let provider = StaticTaxRates::standard(TaxRate::from_bps(2000));
        let rate = effective_rate(&zone(VatSetting::None, 2000), &provider);
        assert!(rate.is_zero());
        assert_eq!(VatBreakdown::apply(Money::from_pence(1000), rate).vat_amount, Money::zero());
    }

    #[test]
    fn test_custom_zero_rate_is_zero() {
        let provider = StaticTaxRates::standard(TaxRate::from_bps(2000));
        assert!(effective_rate(&zone(VatSetting::Custom, 0), &provider).is_zero());
    }

    #[test]
    fn test_global_prefers_shipping_then_standard() {
        let global = zone(VatSetting::Global, 0);

        let both = StaticTaxRates {
            standard: Some(TaxRate::from_bps(2000)),
            shipping: Some(TaxRate::from_bps(500)),
        };
        assert_eq!(effective_rate(&global, &both).bps(), 500);

        let zero_rated_shipping = StaticTaxRates {
            standard: Some(TaxRate::from_bps(2000)),
            shipping: Some(TaxRate::zero()),
        };
        assert_eq!(effective_rate(&global, &zero_rated_shipping).bps(), 0);

        let standard_only = StaticTaxRates::standard(TaxRate::from_bps(2000));
        assert_eq!(effective_rate(&global, &standard_only).bps(), 2000);

        assert!(effective_rate(&global, &StaticTaxRates::default()).is_zero());
    }

    #[test]
    fn test_breakdown_at_largest_cost_does_not_overflow() {
        let costs = VatBreakdown::apply(Money::from_pence(i64::MAX - 1), TaxRate::from_bps(10_000));
        assert_eq!(costs.vat_amount.pence(), i64::MAX - 1);
        assert_eq!(costs.cost_inc_vat.pence(), i64::MAX);
    }

    #[test]
    fn test_free_breakdown() {
        let costs = VatBreakdown::free();
        assert!(costs.cost_ex_vat.is_zero() && costs.vat_amount.is_zero() && costs.cost_inc_vat.is_zero());
    }
}
