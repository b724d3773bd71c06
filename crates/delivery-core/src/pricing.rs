//! Tier selection: which price applies to a basket.

use crate::money::Money;
use crate::types::PricingTier;

/// Finds the tier covering `subtotal`.
///
/// Tiers are considered in ascending `min_purchase` order and both bounds
/// are inclusive; the first covering tier wins. `None` means the zone has no
/// price for this basket, which is a valid outcome rather than an error.
///
/// ## Example
/// ```rust
/// use delivery_core::money::Money;
/// use delivery_core::pricing::select_tier;
/// use delivery_core::types::PricingTier;
///
/// let tiers = [
///     PricingTier::new(Money::from_pence(10001), Money::from_pence(99_999_999), Money::from_pence(1000)).unwrap(),
///     PricingTier::new(Money::zero(), Money::from_pence(10000), Money::from_pence(2000)).unwrap(),
/// ];
///
/// let tier = select_tier(&tiers, Money::from_pence(10000)).unwrap();
/// assert_eq!(tier.base_cost().pence(), 2000);
/// ```
pub fn select_tier(tiers: &[PricingTier], subtotal: Money) -> Option<&PricingTier> {
    let mut ordered: Vec<&PricingTier> = tiers.iter().collect();
    ordered.sort_by_key(|tier| tier.min_purchase());
    ordered.into_iter().find(|tier| tier.covers(subtotal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(min: i64, max: i64, cost: i64) -> PricingTier {
        PricingTier::new(Money::from_pence(min), Money::from_pence(max), Money::from_pence(cost)).unwrap()
    }

    fn local_tiers() -> Vec<PricingTier> {
        vec![tier(0, 10000, 2000), tier(10001, 99_999_999, 1000)]
    }

    #[test]
    fn test_boundary_values() {
        let tiers = local_tiers();
        assert_eq!(select_tier(&tiers, Money::from_pence(10000)).unwrap().base_cost().pence(), 2000);
        assert_eq!(select_tier(&tiers, Money::from_pence(10001)).unwrap().base_cost().pence(), 1000);
        assert_eq!(select_tier(&tiers, Money::zero()).unwrap().base_cost().pence(), 2000);
        assert_eq!(select_tier(&tiers, Money::from_pence(99_999_999)).unwrap().base_cost().pence(), 1000);
    }

    #[test]
    fn test_gap_and_out_of_range_yield_none() {
        let tiers = vec![tier(0, 5000, 500), tier(10000, 20000, 300)];
        assert!(select_tier(&tiers, Money::from_pence(7500)).is_none());
        assert!(select_tier(&tiers, Money::from_pence(20001)).is_none());
        assert!(select_tier(&[], Money::zero()).is_none());
    }

    #[test]
    fn test_lowest_minimum_wins_on_shared_boundary() {
        // Only reachable with data written outside the validator.
        let tiers = vec![tier(10000, 20000, 100), tier(0, 10000, 200)];
        assert_eq!(select_tier(&tiers, Money::from_pence(10000)).unwrap().base_cost().pence(), 200);
    }
}
