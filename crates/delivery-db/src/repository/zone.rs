//! # Zone Repository
//!
//! Zones and the postcode patterns they own.
//!
//! ## Save Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(None, draft)          save(Some(id), draft)                       │
//! │  ─────────────────          ─────────────────────                       │
//! │  BEGIN                      BEGIN                                       │
//! │  INSERT zone                UPDATE zone (0 rows → NotFound, rollback)   │
//! │  INSERT patterns            DELETE patterns; INSERT patterns            │
//! │  INSERT default tier        (tiers untouched)                           │
//! │  COMMIT                     COMMIT                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drafts must already be validated (`delivery_core::validation`).

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use delivery_core::resolver::ZonePatterns;
use delivery_core::{PricingTier, TaxRate, VatSetting, Zone, ZoneDraft, ZoneId, DEFAULT_TIER_COST};

use crate::error::{DbError, DbResult};
use crate::repository::tier::insert_tiers;

/// Row shape of the `zones` table.
#[derive(Debug, FromRow)]
struct ZoneRow {
    id: ZoneId,
    name: String,
    enabled: bool,
    delivery_time: String,
    description: String,
    vat_setting: VatSetting,
    custom_vat_rate_bps: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ZoneRow> for Zone {
    fn from(row: ZoneRow) -> Self {
        Zone {
            id: row.id,
            name: row.name,
            enabled: row.enabled,
            delivery_time: row.delivery_time,
            description: row.description,
            vat_setting: row.vat_setting,
            custom_vat_rate: TaxRate::from_stored_bps(row.custom_vat_rate_bps),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PatternRow {
    zone_id: ZoneId,
    pattern: String,
}

const ZONE_COLUMNS: &str = "id, name, enabled, delivery_time, description, vat_setting, \
                            custom_vat_rate_bps, created_at, updated_at";

/// Repository for zone and pattern operations.
#[derive(Debug, Clone)]
pub struct ZoneRepository {
    pool: SqlitePool,
}

impl ZoneRepository {
    /// Creates a new ZoneRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ZoneRepository { pool }
    }

    /// Gets a zone by id.
    pub async fn get(&self, id: ZoneId) -> DbResult<Option<Zone>> {
        let row: Option<ZoneRow> = sqlx::query_as(&format!("SELECT {ZONE_COLUMNS} FROM zones WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Zone::from))
    }

    pub async fn exists(&self, id: ZoneId) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM zones WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// All zones, enabled or not, by id.
    pub async fn list(&self) -> DbResult<Vec<Zone>> {
        let rows: Vec<ZoneRow> = sqlx::query_as(&format!("SELECT {ZONE_COLUMNS} FROM zones ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Zone::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM zones")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// A zone's patterns in insertion order.
    pub async fn patterns_for(&self, id: ZoneId) -> DbResult<Vec<String>> {
        let patterns: Vec<String> =
            sqlx::query_scalar("SELECT pattern FROM postcode_patterns WHERE zone_id = ?1 ORDER BY id")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        Ok(patterns)
    }

    /// Snapshot the resolver matches against: every enabled zone with its
    /// patterns, ordered by zone id.
    ///
    /// Two fixed queries regardless of how many candidate keys a postcode
    /// produces; matching happens in memory.
    pub async fn list_enabled_with_patterns(&self) -> DbResult<Vec<ZonePatterns>> {
        let zones: Vec<ZoneRow> = sqlx::query_as(&format!(
            "SELECT {ZONE_COLUMNS} FROM zones WHERE enabled = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let patterns: Vec<PatternRow> = sqlx::query_as(
            r#"
            SELECT p.zone_id, p.pattern
            FROM postcode_patterns p
            INNER JOIN zones z ON z.id = p.zone_id
            WHERE z.enabled = 1
            ORDER BY p.zone_id, p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut snapshot: Vec<ZonePatterns> = zones
            .into_iter()
            .map(|row| ZonePatterns {
                zone: Zone::from(row),
                patterns: Vec::new(),
            })
            .collect();

        for row in patterns {
            if let Ok(index) = snapshot.binary_search_by_key(&row.zone_id, |entry| entry.zone.id) {
                snapshot[index].patterns.push(row.pattern);
            }
        }

        debug!(zones = snapshot.len(), "Loaded enabled zone snapshot");
        Ok(snapshot)
    }

    /// Creates (`id == None`) or updates a zone and replaces its patterns,
    /// all in one transaction.
    ///
    /// A new zone also gets the open-ended default tier so it prices
    /// immediately. Updating never touches tiers.
    ///
    /// ## Errors
    /// `DbError::NotFound` if `id` is given but no such zone exists.
    pub async fn save(&self, id: Option<ZoneId>, draft: &ZoneDraft) -> DbResult<ZoneId> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let zone_id = match id {
            Some(zone_id) => {
                debug!(zone_id = %zone_id, name = %draft.name, "Updating zone");
                update_zone(&mut tx, zone_id, draft, now).await?;
                sqlx::query("DELETE FROM postcode_patterns WHERE zone_id = ?1")
                    .bind(zone_id)
                    .execute(&mut *tx)
                    .await?;
                zone_id
            }
            None => {
                debug!(name = %draft.name, "Creating zone");
                let zone_id = insert_zone(&mut tx, draft, now).await?;
                let default_tier = PricingTier::open_ended(DEFAULT_TIER_COST)
                    .map_err(|e| DbError::invalid_data("pricing_tiers", e))?;
                insert_tiers(&mut tx, zone_id, &[default_tier]).await?;
                zone_id
            }
        };

        insert_patterns(&mut tx, zone_id, &draft.patterns).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            zone_id = %zone_id,
            patterns = draft.patterns.len(),
            created = id.is_none(),
            "Zone saved"
        );
        Ok(zone_id)
    }

    /// Deletes a zone; its patterns and tiers go with it.
    pub async fn delete(&self, id: ZoneId) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM zones WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Zone", id));
        }

        info!(zone_id = %id, "Zone deleted");
        Ok(())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Inserts a zone row, returning its new id.
pub(crate) async fn insert_zone(conn: &mut SqliteConnection, draft: &ZoneDraft, now: DateTime<Utc>) -> DbResult<ZoneId> {
    let result = sqlx::query(
        r#"
        INSERT INTO zones (
            name, enabled, delivery_time, description,
            vat_setting, custom_vat_rate_bps, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&draft.name)
    .bind(draft.enabled)
    .bind(&draft.delivery_time)
    .bind(&draft.description)
    .bind(draft.vat_setting)
    .bind(i64::from(draft.custom_vat_rate.bps()))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(ZoneId::new(result.last_insert_rowid()))
}

async fn update_zone(conn: &mut SqliteConnection, id: ZoneId, draft: &ZoneDraft, now: DateTime<Utc>) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE zones SET
            name = ?1,
            enabled = ?2,
            delivery_time = ?3,
            description = ?4,
            vat_setting = ?5,
            custom_vat_rate_bps = ?6,
            updated_at = ?7
        WHERE id = ?8
        "#,
    )
    .bind(&draft.name)
    .bind(draft.enabled)
    .bind(&draft.delivery_time)
    .bind(&draft.description)
    .bind(draft.vat_setting)
    .bind(i64::from(draft.custom_vat_rate.bps()))
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Zone", id));
    }
    Ok(())
}

/// Inserts already-normalized patterns for a zone.
pub(crate) async fn insert_patterns(conn: &mut SqliteConnection, zone_id: ZoneId, patterns: &[String]) -> DbResult<()> {
    for pattern in patterns {
        sqlx::query("INSERT INTO postcode_patterns (zone_id, pattern, created_at) VALUES (?1, ?2, ?3)")
            .bind(zone_id)
            .bind(pattern)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn draft(name: &str, patterns: &[&str]) -> ZoneDraft {
        ZoneDraft::new(name, patterns.iter().map(|p| p.to_string()).collect())
    }

    #[tokio::test]
    async fn test_create_zone_adds_patterns_and_default_tier() {
        let db = setup().await;
        let id = db.zones().save(None, &draft("Zone 1 - Local", &["CF"])).await.unwrap();

        let zone = db.zones().get(id).await.unwrap().unwrap();
        assert_eq!(zone.name, "Zone 1 - Local");
        assert!(zone.enabled);
        assert_eq!(zone.vat_setting, VatSetting::Global);
        assert_eq!(db.zones().patterns_for(id).await.unwrap(), ["CF"]);

        let tiers = db.tiers().list_for_zone(id).await.unwrap();
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].base_cost(), DEFAULT_TIER_COST);
        assert_eq!(tiers[0].max_purchase().pence(), 99_999_999);
    }

    #[tokio::test]
    async fn test_update_replaces_patterns_keeps_tiers() {
        let db = setup().await;
        let id = db.zones().save(None, &draft("Regional", &["B", "M"])).await.unwrap();

        let mut update = draft("Regional North", &["M", "L"]);
        update.vat_setting = VatSetting::Custom;
        update.custom_vat_rate = TaxRate::from_bps(500);
        assert_eq!(db.zones().save(Some(id), &update).await.unwrap(), id);

        let zone = db.zones().get(id).await.unwrap().unwrap();
        assert_eq!(zone.name, "Regional North");
        assert_eq!(zone.custom_vat_rate.bps(), 500);
        assert_eq!(db.zones().patterns_for(id).await.unwrap(), ["M", "L"]);
        assert_eq!(db.tiers().list_for_zone(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_zone_is_not_found() {
        let db = setup().await;
        let err = db.zones().save(Some(ZoneId::new(99)), &draft("Ghost", &["ZZ"])).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.zones().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_pattern_rolls_back_whole_save() {
        let db = setup().await;
        let err = db.zones().save(None, &draft("Dup", &["CF", "CF"])).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        assert_eq!(db.zones().count().await.unwrap(), 0);
        let tiers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pricing_tiers")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tiers, 0);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = setup().await;
        let id = db.zones().save(None, &draft("Local", &["CF", "CF10"])).await.unwrap();

        db.zones().delete(id).await.unwrap();

        assert!(!db.zones().exists(id).await.unwrap());
        assert!(db.zones().patterns_for(id).await.unwrap().is_empty());
        assert!(db.tiers().list_for_zone(id).await.unwrap().is_empty());
        assert!(matches!(db.zones().delete(id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_enabled_snapshot() {
        let db = setup().await;
        let local = db.zones().save(None, &draft("Local", &["CF"])).await.unwrap();
        let mut disabled = draft("Closed", &["B"]);
        disabled.enabled = false;
        db.zones().save(None, &disabled).await.unwrap();
        let regional = db.zones().save(None, &draft("Regional", &["B", "M"])).await.unwrap();

        let snapshot = db.zones().list_enabled_with_patterns().await.unwrap();
        let ids: Vec<ZoneId> = snapshot.iter().map(|entry| entry.zone.id).collect();
        assert_eq!(ids, [local, regional]);
        assert_eq!(snapshot[1].patterns, ["B", "M"]);
        assert_eq!(db.zones().list().await.unwrap().len(), 3);
    }
}
