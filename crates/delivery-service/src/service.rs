//! # Delivery Service
//!
//! The operations the storefront and the admin screens call.
//!
//! ## Quote Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_delivery_options("cf10 1aa", £50.00)                          │
//! │       │                                                                 │
//! │       ├── settings: collection, excluded prefixes                      │
//! │       ├── PostcodeQuery::parse → "CF101AA" + [CF10, CF1, CF, CF101AA]  │
//! │       ├── QuoteStatus::precheck (empty? excluded?)                     │
//! │       ├── zones().list_enabled_with_patterns()   (one snapshot)        │
//! │       ├── resolver::resolve_zones                (in memory)           │
//! │       ├── tiers().list_for_zone(..) per matched zone                   │
//! │       └── DeliveryQuote::build → [collection, zone_1, ...] + status    │
//! │                                                                         │
//! │  Any store failure ──► warn! + collection-only quote (never an error)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Admin Writes
//! Admin operations validate first and return [`crate::ServiceError`] verbatim;
//! each write is one transaction in delivery-db.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use delivery_core::postcode::split_list;
use delivery_core::resolver::resolve_zones;
use delivery_core::validation::{has_empty_custom_rate, validate_tiers, validate_zone_draft};
use delivery_core::{
    CollectionSettings, CoreError, DeliveryOption, DeliveryQuote, ExcludedPostcodes, Money, PostcodeQuery, PricingTier,
    ProposedTier, QuoteStatus, TaxRateProvider, Zone, ZoneDetails, ZoneDraft, ZoneId,
};
use delivery_db::{migrate_legacy_zones, Database, DbConfig, DbResult, LegacyOutcome};

use crate::config::ServiceConfig;
use crate::error::ServiceResult;

// =============================================================================
// Requote
// =============================================================================

/// A refreshed quote plus the customer's earlier choice, if still offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requote {
    pub quote: DeliveryQuote,
    pub selected: Option<DeliveryOption>,
}

// =============================================================================
// Delivery Service
// =============================================================================

/// Delivery pricing and zone administration over one configuration store.
///
/// Cheap to clone; clones share the pool and the tax rate provider.
#[derive(Clone)]
pub struct DeliveryService {
    db: Database,
    tax_rates: Arc<dyn TaxRateProvider>,
}

impl std::fmt::Debug for DeliveryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryService").field("db", &self.db).finish_non_exhaustive()
    }
}

impl DeliveryService {
    pub fn new(db: Database, tax_rates: Arc<dyn TaxRateProvider>) -> Self {
        DeliveryService { db, tax_rates }
    }

    /// Opens the configured database and runs the legacy import if enabled.
    pub async fn connect(config: &ServiceConfig) -> ServiceResult<Self> {
        config.ensure_data_dir()?;

        let db = Database::new(DbConfig::new(&config.database_path).max_connections(config.max_connections)).await?;
        let service = DeliveryService::new(db, Arc::new(config.tax_rates()));

        if config.run_legacy_migration {
            let outcome = service.migrate_legacy().await?;
            debug!(?outcome, "Legacy zone import checked");
        }

        Ok(service)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Storefront
    // =========================================================================

    /// Every option the customer can choose for this postcode and basket.
    ///
    /// Never fails: store errors are logged and the customer gets the
    /// collection option alone.
    pub async fn resolve_delivery_options(&self, postcode: &str, subtotal: Money) -> DeliveryQuote {
        let query = PostcodeQuery::parse(postcode);

        let collection = match self.db.settings().collection().await {
            Ok(collection) => collection,
            Err(err) => {
                warn!(error = %err, "Could not load collection settings, using defaults");
                CollectionSettings::default()
            }
        };

        match self.quote(&query, subtotal, &collection).await {
            Ok(quote) => {
                debug!(
                    postcode = %quote.postcode(),
                    status = ?quote.status(),
                    options = quote.options().len(),
                    "Delivery options resolved"
                );
                quote
            }
            Err(err) => {
                warn!(
                    postcode = %query.full(),
                    error = %err,
                    "Delivery resolution failed, offering collection only"
                );
                DeliveryQuote::collection_only(&query, &collection, QuoteStatus::NoZone)
            }
        }
    }

    async fn quote(
        &self,
        query: &PostcodeQuery,
        subtotal: Money,
        collection: &CollectionSettings,
    ) -> DbResult<DeliveryQuote> {
        let excluded = self.db.settings().excluded_postcodes().await?;
        if let Some(status) = QuoteStatus::precheck(query, &excluded) {
            return Ok(DeliveryQuote::collection_only(query, collection, status));
        }

        let snapshot = self.db.zones().list_enabled_with_patterns().await?;
        let zones = resolve_zones(query, &snapshot);

        let mut matched: Vec<(Zone, Vec<PricingTier>)> = Vec::with_capacity(zones.len());
        for zone in zones {
            let tiers = self.db.tiers().list_for_zone(zone.id).await?;
            matched.push((zone.clone(), tiers));
        }

        Ok(DeliveryQuote::build(
            query,
            subtotal,
            &excluded,
            collection,
            &matched,
            self.tax_rates.as_ref(),
        ))
    }

    /// Recomputes options after the cart changed.
    ///
    /// `selected` is the refreshed copy of `selected_option_id`, or `None`
    /// when that option is no longer offered.
    pub async fn requote(
        &self,
        previous_postcode: &str,
        subtotal: Money,
        selected_option_id: Option<&str>,
    ) -> Requote {
        let quote = self.resolve_delivery_options(previous_postcode, subtotal).await;
        let selected = selected_option_id.and_then(|id| quote.option(id).cloned());

        if let (Some(id), None) = (selected_option_id, &selected) {
            debug!(option_id = id, "Previously selected option no longer available");
        }

        Requote { quote, selected }
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Validates a tier set and atomically replaces the zone's tiers.
    ///
    /// Returns the number of tiers saved. Nothing is written on error.
    pub async fn validate_and_save_tiers(&self, zone_id: ZoneId, proposed: &[ProposedTier]) -> ServiceResult<usize> {
        let tiers = validate_tiers(proposed).inspect_err(|err| {
            debug!(zone_id = %zone_id, error = %err, "Tier set rejected");
        })?;

        let saved = self.db.tiers().replace_for_zone(zone_id, &tiers).await?;
        info!(zone_id = %zone_id, tiers = saved, "Pricing tiers saved");
        Ok(saved)
    }

    /// Creates (`zone_id == None`) or updates a zone with its patterns.
    pub async fn save_zone_configuration(&self, zone_id: Option<ZoneId>, draft: ZoneDraft) -> ServiceResult<ZoneId> {
        let draft = validate_zone_draft(&draft)?;
        if has_empty_custom_rate(&draft) {
            warn!(name = %draft.name, "Zone uses a custom VAT rate of 0%");
        }

        Ok(self.db.zones().save(zone_id, &draft).await?)
    }

    pub async fn delete_zone(&self, zone_id: ZoneId) -> ServiceResult<()> {
        Ok(self.db.zones().delete(zone_id).await?)
    }

    /// All zones, enabled or not, with patterns and tiers.
    pub async fn list_zones(&self) -> ServiceResult<Vec<ZoneDetails>> {
        let zones = self.db.zones().list().await?;

        let mut details = Vec::with_capacity(zones.len());
        for zone in zones {
            let patterns = self.db.zones().patterns_for(zone.id).await?;
            let tiers = self.db.tiers().list_for_zone(zone.id).await?;
            details.push(ZoneDetails { zone, patterns, tiers });
        }
        Ok(details)
    }

    pub async fn zone_details(&self, zone_id: ZoneId) -> ServiceResult<ZoneDetails> {
        let zone = self
            .db
            .zones()
            .get(zone_id)
            .await?
            .ok_or(CoreError::ZoneNotFound(zone_id))?;
        let patterns = self.db.zones().patterns_for(zone_id).await?;
        let tiers = self.db.tiers().list_for_zone(zone_id).await?;
        Ok(ZoneDetails { zone, patterns, tiers })
    }

    /// Saves a comma-separated prefix list, e.g. `"ab, bt"`.
    pub async fn set_excluded_postcodes(&self, list: &str) -> ServiceResult<ExcludedPostcodes> {
        let excluded = ExcludedPostcodes::new(split_list(list));
        self.db.settings().set_excluded_postcodes(&excluded).await?;
        Ok(excluded)
    }

    pub async fn excluded_postcodes(&self) -> ServiceResult<ExcludedPostcodes> {
        Ok(self.db.settings().excluded_postcodes().await?)
    }

    pub async fn set_collection_settings(&self, settings: &CollectionSettings) -> ServiceResult<()> {
        Ok(self.db.settings().set_collection(settings).await?)
    }

    pub async fn collection_settings(&self) -> ServiceResult<CollectionSettings> {
        Ok(self.db.settings().collection().await?)
    }

    /// Runs the one-time legacy zone import. Safe to call repeatedly.
    pub async fn migrate_legacy(&self) -> ServiceResult<LegacyOutcome> {
        let outcome = migrate_legacy_zones(&self.db).await?;
        if let LegacyOutcome::Imported { zones } = outcome {
            info!(zones, "Legacy zones imported");
        }
        Ok(outcome)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
