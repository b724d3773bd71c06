//! # Delivery Quote
//!
//! Assembles the options a customer can pick from at checkout.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  raw postcode ──► PostcodeQuery                                         │
//! │                       │                                                 │
//! │         empty? ───────┼──► NoPostcode   (collection only)               │
//! │         excluded? ────┼──► Excluded     (collection only)               │
//! │                       ▼                                                 │
//! │              matched zones + their tiers (caller resolves/loads)        │
//! │                       │                                                 │
//! │         none matched ─┼──► NoZone       (collection only)               │
//! │         none priced ──┼──► NoPricing    (collection only)               │
//! │                       ▼                                                 │
//! │                   Available  [collection, zone_1, zone_3, ...]          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Options are value objects: built once per request, never mutated.

use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::postcode::{ExcludedPostcodes, PostcodeQuery};
use crate::pricing::select_tier;
use crate::types::{CollectionSettings, PricingTier, TaxRate, Zone, ZoneId};
use crate::vat::{effective_rate, TaxRateProvider, VatBreakdown};
use crate::{COLLECTION_OPTION_ID, ZONE_OPTION_PREFIX};

/// Delivery time text shown on the collection option.
pub const COLLECTION_DELIVERY_TIME: &str = "Available for collection";

// =============================================================================
// Delivery Option
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOptionType {
    Delivery,
    Collection,
}

/// One selectable option at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DeliveryOption {
    id: String,
    name: String,
    #[serde(rename = "type")]
    option_type: DeliveryOptionType,
    cost_ex_vat: Money,
    vat_amount: Money,
    cost_inc_vat: Money,
    vat_rate: TaxRate,
    delivery_time: String,
    description: String,
    zone_id: Option<ZoneId>,
    tier: Option<PricingTier>,
}

impl DeliveryOption {
    /// A priced delivery option for `zone`.
    pub fn delivery(zone: &Zone, tier: &PricingTier, rate: TaxRate) -> Self {
        let costs = VatBreakdown::apply(tier.base_cost(), rate);
        DeliveryOption {
            id: format!("{}{}", ZONE_OPTION_PREFIX, zone.id),
            name: zone.name.clone(),
            option_type: DeliveryOptionType::Delivery,
            cost_ex_vat: costs.cost_ex_vat,
            vat_amount: costs.vat_amount,
            cost_inc_vat: costs.cost_inc_vat,
            vat_rate: costs.rate,
            delivery_time: zone.delivery_time.clone(),
            description: zone.description.clone(),
            zone_id: Some(zone.id),
            tier: Some(*tier),
        }
    }

    /// The free store collection option.
    pub fn collection(settings: &CollectionSettings) -> Self {
        let costs = VatBreakdown::free();
        DeliveryOption {
            id: COLLECTION_OPTION_ID.to_string(),
            name: settings.name.clone(),
            option_type: DeliveryOptionType::Collection,
            cost_ex_vat: costs.cost_ex_vat,
            vat_amount: costs.vat_amount,
            cost_inc_vat: costs.cost_inc_vat,
            vat_rate: costs.rate,
            delivery_time: COLLECTION_DELIVERY_TIME.to_string(),
            description: settings.description.clone(),
            zone_id: None,
            tier: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn option_type(&self) -> DeliveryOptionType {
        self.option_type
    }

    pub fn cost_ex_vat(&self) -> Money {
        self.cost_ex_vat
    }

    pub fn vat_amount(&self) -> Money {
        self.vat_amount
    }

    pub fn cost_inc_vat(&self) -> Money {
        self.cost_inc_vat
    }

    pub fn vat_rate(&self) -> TaxRate {
        self.vat_rate
    }

    pub fn delivery_time(&self) -> &str {
        &self.delivery_time
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn zone_id(&self) -> Option<ZoneId> {
        self.zone_id
    }

    /// The tier this price came from; `None` for collection.
    pub fn tier(&self) -> Option<&PricingTier> {
        self.tier.as_ref()
    }

    pub fn is_collection(&self) -> bool {
        self.option_type == DeliveryOptionType::Collection
    }
}

// =============================================================================
// Quote Status
// =============================================================================

/// Why a quote does or does not contain delivery options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteStatus {
    /// At least one zone priced this basket.
    Available,
    /// Nothing usable was entered.
    NoPostcode,
    /// The postcode starts with an excluded prefix.
    Excluded { prefix: String },
    /// No enabled zone serves the postcode.
    NoZone,
    /// Zones serve the postcode, but none has a tier for this subtotal.
    NoPricing,
}

impl QuoteStatus {
    /// Statuses decided from the postcode alone, before any zone lookup.
    pub fn precheck(query: &PostcodeQuery, excluded: &ExcludedPostcodes) -> Option<QuoteStatus> {
        if query.is_empty() {
            return Some(QuoteStatus::NoPostcode);
        }
        excluded
            .matching_prefix(query.full())
            .map(|prefix| QuoteStatus::Excluded {
                prefix: prefix.to_string(),
            })
    }

    /// Customer-facing text.
    pub fn message(&self) -> &'static str {
        match self {
            QuoteStatus::Available => "Available delivery options:",
            QuoteStatus::NoPostcode => "Please enter a postcode",
            QuoteStatus::Excluded { .. } => "Sorry, we do not deliver to this postcode area.",
            QuoteStatus::NoZone => "This zone is not registered for delivery",
            QuoteStatus::NoPricing => "We deliver to this postcode, but not for an order of this value",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, QuoteStatus::Available)
    }
}

// =============================================================================
// Delivery Quote
// =============================================================================

/// The complete answer to "what can I pick for this postcode and basket".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DeliveryQuote {
    postcode: String,
    options: Vec<DeliveryOption>,
    status: QuoteStatus,
}

impl DeliveryQuote {
    /// A quote carrying only the collection option (if enabled).
    pub fn collection_only(query: &PostcodeQuery, collection: &CollectionSettings, status: QuoteStatus) -> Self {
        DeliveryQuote {
            postcode: query.full().to_string(),
            options: collection_options(collection),
            status,
        }
    }

    /// Builds the quote from zones the caller already resolved.
    ///
    /// `matched` holds every enabled zone serving `query` with that zone's
    /// tiers. The caller is expected to have run [`QuoteStatus::precheck`];
    /// it is repeated here so this function is safe to call on its own.
    pub fn build(
        query: &PostcodeQuery,
        subtotal: Money,
        excluded: &ExcludedPostcodes,
        collection: &CollectionSettings,
        matched: &[(Zone, Vec<PricingTier>)],
        provider: &dyn TaxRateProvider,
    ) -> Self {
        if let Some(status) = QuoteStatus::precheck(query, excluded) {
            return DeliveryQuote::collection_only(query, collection, status);
        }
        if matched.is_empty() {
            return DeliveryQuote::collection_only(query, collection, QuoteStatus::NoZone);
        }

        let mut ordered: Vec<&(Zone, Vec<PricingTier>)> = matched.iter().collect();
        ordered.sort_by_key(|(zone, _)| zone.id);
        ordered.dedup_by_key(|(zone, _)| zone.id);

        let delivery: Vec<DeliveryOption> = ordered
            .into_iter()
            .filter_map(|(zone, tiers)| {
                select_tier(tiers, subtotal)
                    .map(|tier| DeliveryOption::delivery(zone, tier, effective_rate(zone, provider)))
            })
            .collect();

        if delivery.is_empty() {
            return DeliveryQuote::collection_only(query, collection, QuoteStatus::NoPricing);
        }

        let mut options = collection_options(collection);
        options.extend(delivery);

        DeliveryQuote {
            postcode: query.full().to_string(),
            options,
            status: QuoteStatus::Available,
        }
    }

    /// Normalized postcode the quote was computed for.
    pub fn postcode(&self) -> &str {
        &self.postcode
    }

    /// Collection first (if enabled), then delivery options by zone id.
    pub fn options(&self) -> &[DeliveryOption] {
        &self.options
    }

    pub fn into_options(self) -> Vec<DeliveryOption> {
        self.options
    }

    pub fn status(&self) -> &QuoteStatus {
        &self.status
    }

    pub fn option(&self, id: &str) -> Option<&DeliveryOption> {
        self.options.iter().find(|option| option.id() == id)
    }

    pub fn delivery_options(&self) -> impl Iterator<Item = &DeliveryOption> {
        self.options.iter().filter(|option| !option.is_collection())
    }

    /// Headline for the customer, e.g. "2 delivery options found".
    pub fn summary(&self) -> String {
        if self.options.is_empty() {
            return "No delivery or collection options available.".to_string();
        }
        match self.delivery_options().count() {
            0 => self.status.message().to_string(),
            1 => "1 delivery option found".to_string(),
            n => format!("{} delivery options found", n),
        }
    }
}

fn collection_options(collection: &CollectionSettings) -> Vec<DeliveryOption> {
    if collection.enabled {
        vec![DeliveryOption::collection(collection)]
    } else {
        Vec::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
