//! # Legacy Zone Import
//!
//! One-time move of the old single-setting zone blob into the relational
//! tables.
//!
//! ## Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  zone_schema_version >= 1 ? ──yes──► Skipped                            │
//! │          │ no                                                           │
//! │          ▼                                                              │
//! │  BEGIN                                                                  │
//! │    blob missing/empty, or zones table not empty                        │
//! │          ──► write version 1, COMMIT ──► NothingToImport                │
//! │    otherwise, for each legacy zone:                                    │
//! │          INSERT zone, patterns, tiers (single `cost` → one tier)       │
//! │    copy blob to legacy_zones_backup, delete legacy_zones               │
//! │    write version 1                                                     │
//! │  COMMIT ──► Imported { zones }                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure rolls everything back and leaves the blob and version marker
//! untouched, so the import can be retried after fixing the data.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use delivery_core::postcode::normalize_pattern;
use delivery_core::validation::{validate_tiers, validate_zone_name};
use delivery_core::{Money, PricingTier, ProposedTier, TaxRate, VatSetting, ZoneDraft, OPEN_ENDED_MAX_PURCHASE};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::settings::{
    delete_key, get_json, put_json, LEGACY_ZONES_BACKUP_KEY, LEGACY_ZONES_KEY, SCHEMA_VERSION_KEY,
};
use crate::repository::tier::insert_tiers;
use crate::repository::zone::{insert_patterns, insert_zone};

/// Zone data schema version written by this import.
pub const TARGET_SCHEMA_VERSION: u32 = 1;

/// What [`migrate_legacy_zones`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LegacyOutcome {
    /// Version marker already at the target.
    Skipped,
    /// No blob, an empty blob, or zones already configured.
    NothingToImport,
    Imported { zones: usize },
}

// =============================================================================
// Blob Format
// =============================================================================

/// A number the old settings screen may have saved as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LegacyNumber {
    Number(f64),
    Text(String),
}

impl LegacyNumber {
    fn to_money(&self) -> Option<Money> {
        match self {
            LegacyNumber::Number(value) if value.is_finite() => {
                Some(Money::from_pence((value * 100.0).round() as i64))
            }
            LegacyNumber::Number(_) => None,
            LegacyNumber::Text(text) => text.parse().ok(),
        }
    }
}

/// `enabled` was stored as a bool, 0/1, or "0"/"1"/"yes".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LegacyFlag {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl LegacyFlag {
    fn is_set(&self) -> bool {
        match self {
            LegacyFlag::Bool(flag) => *flag,
            LegacyFlag::Number(value) => *value != 0,
            LegacyFlag::Text(text) => !matches!(text.trim().to_ascii_lowercase().as_str(), "" | "0" | "no" | "false"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyTier {
    min_purchase: Option<LegacyNumber>,
    max_purchase: Option<LegacyNumber>,
    base_cost: Option<LegacyNumber>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyZone {
    name: Option<String>,
    enabled: Option<LegacyFlag>,
    delivery_time: Option<String>,
    description: Option<String>,
    vat_setting: Option<String>,
    custom_vat_rate: Option<LegacyNumber>,
    #[serde(default)]
    postcodes: Vec<String>,
    pricing_tiers: Option<Vec<LegacyTier>>,
    cost: Option<LegacyNumber>,
}

/// A legacy zone converted to validated records, ready to insert.
#[derive(Debug, Clone, PartialEq)]
struct ImportedZone {
    draft: ZoneDraft,
    tiers: Vec<PricingTier>,
}

/// Parses the blob: either a JSON array or an object keyed by old zone id.
fn parse_blob(blob: &Value) -> DbResult<Vec<(String, LegacyZone)>> {
    let entries: Vec<(String, Value)> = match blob {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| ((index + 1).to_string(), item.clone()))
            .collect(),
        Value::Object(map) => map.iter().map(|(key, item)| (key.clone(), item.clone())).collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(DbError::invalid_data(
                LEGACY_ZONES_KEY,
                format!("expected an array or object, found {}", other),
            ))
        }
    };

    entries
        .into_iter()
        .map(|(key, item)| {
            serde_json::from_value::<LegacyZone>(item)
                .map(|zone| (key.clone(), zone))
                .map_err(|e| DbError::invalid_data(LEGACY_ZONES_KEY, format!("zone {}: {}", key, e)))
        })
        .collect()
}

fn convert_zone(key: &str, legacy: &LegacyZone) -> DbResult<ImportedZone> {
    let name = legacy
        .name
        .as_deref()
        .and_then(|name| validate_zone_name(name).ok())
        .unwrap_or_else(|| format!("Zone {}", key));

    let vat_setting = match legacy.vat_setting.as_deref() {
        None => VatSetting::Global,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(zone = %key, vat_setting = %raw, "Unknown legacy VAT setting, using global");
            VatSetting::Global
        }),
    };

    // percent with two decimals is the same hundredths scale as pence
    let custom_vat_rate = legacy
        .custom_vat_rate
        .as_ref()
        .and_then(LegacyNumber::to_money)
        .map(|hundredths| TaxRate::from_stored_bps(hundredths.pence().min(10000)))
        .unwrap_or_else(TaxRate::zero);

    let mut patterns: Vec<String> = Vec::new();
    for raw in &legacy.postcodes {
        match normalize_pattern(raw) {
            Ok(pattern) if !patterns.contains(&pattern) => patterns.push(pattern),
            Ok(_) => {}
            Err(e) => warn!(zone = %key, pattern = %raw, error = %e, "Skipping legacy postcode pattern"),
        }
    }

    let proposed: Vec<ProposedTier> = match &legacy.pricing_tiers {
        Some(tiers) if !tiers.is_empty() => tiers
            .iter()
            .map(|tier| {
                ProposedTier::new(
                    tier.min_purchase.as_ref().and_then(LegacyNumber::to_money).unwrap_or_default(),
                    tier.max_purchase
                        .as_ref()
                        .and_then(LegacyNumber::to_money)
                        .unwrap_or(OPEN_ENDED_MAX_PURCHASE),
                    tier.base_cost.as_ref().and_then(LegacyNumber::to_money).unwrap_or_default(),
                )
            })
            .collect(),
        _ => {
            let cost = legacy.cost.as_ref().and_then(LegacyNumber::to_money).unwrap_or_default();
            vec![ProposedTier::new(Money::zero(), OPEN_ENDED_MAX_PURCHASE, cost)]
        }
    };

    let tiers = validate_tiers(&proposed)
        .map_err(|e| DbError::invalid_data(LEGACY_ZONES_KEY, format!("zone {}: {}", key, e)))?;

    Ok(ImportedZone {
        draft: ZoneDraft {
            name,
            enabled: legacy.enabled.as_ref().map(LegacyFlag::is_set).unwrap_or(true),
            delivery_time: legacy.delivery_time.clone().unwrap_or_default(),
            description: legacy.description.clone().unwrap_or_default(),
            vat_setting,
            custom_vat_rate,
            patterns,
        },
        tiers,
    })
}

fn blob_is_empty(blob: &Value) -> bool {
    match blob {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

// =============================================================================
// Migration
// =============================================================================

/// Imports the legacy blob if it has not been imported yet.
///
/// Safe to call on every startup.
pub async fn migrate_legacy_zones(db: &Database) -> DbResult<LegacyOutcome> {
    if db.settings().schema_version().await? >= TARGET_SCHEMA_VERSION {
        return Ok(LegacyOutcome::Skipped);
    }

    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

    let blob: Option<Value> = get_json(&mut tx, LEGACY_ZONES_KEY).await?;
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zones")
        .fetch_one(&mut *tx)
        .await?;

    let outcome = match blob {
        Some(blob) if !blob_is_empty(&blob) && existing == 0 => {
            let legacy = parse_blob(&blob)?;
            let converted = legacy
                .iter()
                .map(|(key, zone)| convert_zone(key, zone))
                .collect::<DbResult<Vec<_>>>()?;

            let now = Utc::now();
            for zone in &converted {
                let zone_id = insert_zone(&mut tx, &zone.draft, now).await?;
                insert_patterns(&mut tx, zone_id, &zone.draft.patterns).await?;
                insert_tiers(&mut tx, zone_id, &zone.tiers).await?;
            }

            put_json(&mut tx, LEGACY_ZONES_BACKUP_KEY, &blob).await?;
            delete_key(&mut tx, LEGACY_ZONES_KEY).await?;
            LegacyOutcome::Imported { zones: converted.len() }
        }
        Some(_) if existing > 0 => {
            warn!(existing, "Legacy zone blob left in place: zones already configured");
            LegacyOutcome::NothingToImport
        }
        _ => LegacyOutcome::NothingToImport,
    };

    put_json(&mut tx, SCHEMA_VERSION_KEY, &TARGET_SCHEMA_VERSION).await?;

    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

    info!(?outcome, version = TARGET_SCHEMA_VERSION, "Legacy zone migration finished");
    Ok(outcome)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use delivery_core::ZoneId;
    use serde_json::json;

    async fn setup_with_blob(blob: Value) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings().set(LEGACY_ZONES_KEY, &blob).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_imports_tiers_and_single_cost() {
        let db = setup_with_blob(json!({
            "3": {
                "name": "Local",
                "enabled": "1",
                "delivery_time": "1-2 working days",
                "vat_setting": "custom",
                "custom_vat_rate": "20",
                "postcodes": ["cf", " CF10 ", "bad-code"],
                "pricing_tiers": [
                    {"min_purchase": 0, "max_purchase": 100, "base_cost": 20},
                    {"min_purchase": "100.01", "max_purchase": "999999.99", "base_cost": "10"}
                ]
            },
            "7": {"enabled": 0, "postcodes": ["B"], "cost": 7.5}
        }))
        .await;

        let outcome = migrate_legacy_zones(&db).await.unwrap();
        assert_eq!(outcome, LegacyOutcome::Imported { zones: 2 });

        let zones = db.zones().list().await.unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].name, "Local");
        assert_eq!(zones[0].vat_setting, VatSetting::Custom);
        assert_eq!(zones[0].custom_vat_rate.bps(), 2000);
        assert_eq!(db.zones().patterns_for(zones[0].id).await.unwrap(), ["CF", "CF10"]);
        assert_eq!(db.tiers().list_for_zone(zones[0].id).await.unwrap().len(), 2);

        assert_eq!(zones[1].name, "Zone 7");
        assert!(!zones[1].enabled);
        let tiers = db.tiers().list_for_zone(zones[1].id).await.unwrap();
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].base_cost().pence(), 750);
        assert_eq!(tiers[0].max_purchase(), OPEN_ENDED_MAX_PURCHASE);

        let settings = db.settings();
        assert!(settings.get::<Value>(LEGACY_ZONES_KEY).await.unwrap().is_none());
        assert!(settings.get::<Value>(LEGACY_ZONES_BACKUP_KEY).await.unwrap().is_some());
        assert_eq!(settings.schema_version().await.unwrap(), TARGET_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_second_run_is_skipped() {
        let db = setup_with_blob(json!([{"name": "Only", "postcodes": ["M"], "cost": 5}])).await;
        assert_eq!(migrate_legacy_zones(&db).await.unwrap(), LegacyOutcome::Imported { zones: 1 });
        assert_eq!(migrate_legacy_zones(&db).await.unwrap(), LegacyOutcome::Skipped);
        assert_eq!(db.zones().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_existing_zones_block_import() {
        let db = setup_with_blob(json!([{"name": "Old", "postcodes": ["M"], "cost": 5}])).await;
        db.zones()
            .save(None, &ZoneDraft::new("Current", vec!["CF".to_string()]))
            .await
            .unwrap();

        assert_eq!(migrate_legacy_zones(&db).await.unwrap(), LegacyOutcome::NothingToImport);
        assert_eq!(db.zones().count().await.unwrap(), 1);
        assert!(db.settings().get::<Value>(LEGACY_ZONES_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_no_blob_marks_version() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(migrate_legacy_zones(&db).await.unwrap(), LegacyOutcome::NothingToImport);
        assert_eq!(db.settings().schema_version().await.unwrap(), TARGET_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_overlapping_legacy_tiers_roll_back_everything() {
        let db = setup_with_blob(json!([
            {"name": "Fine", "postcodes": ["CF"], "cost": 5},
            {"name": "Broken", "postcodes": ["B"], "pricing_tiers": [
                {"min_purchase": 0, "max_purchase": 100, "base_cost": 5},
                {"min_purchase": 100, "max_purchase": 200, "base_cost": 4}
            ]}
        ]))
        .await;

        let err = migrate_legacy_zones(&db).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidData { .. }));
        assert_eq!(db.zones().count().await.unwrap(), 0);
        assert!(db.zones().get(ZoneId::new(1)).await.unwrap().is_none());
        assert_eq!(db.settings().schema_version().await.unwrap(), 0);
        assert!(db.settings().get::<Value>(LEGACY_ZONES_KEY).await.unwrap().is_some());
    }

    #[test]
    fn test_legacy_numbers() {
        assert_eq!(LegacyNumber::Number(7.5).to_money(), Some(Money::from_pence(750)));
        assert_eq!(LegacyNumber::Number(100.01).to_money(), Some(Money::from_pence(10001)));
        assert_eq!(LegacyNumber::Text("12.34".into()).to_money(), Some(Money::from_pence(1234)));
        assert_eq!(LegacyNumber::Text("abc".into()).to_money(), None);
        assert!(LegacyFlag::Text("yes".into()).is_set());
        assert!(!LegacyFlag::Number(0).is_set());
    }
}
