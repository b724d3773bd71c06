//! # Tier Repository
//!
//! Pricing tiers per zone.
//!
//! ## Replacement Contract
//! ```text
//! BEGIN
//!   zone exists?          no  → NotFound, rollback
//!   DELETE zone's tiers
//!   INSERT tier 1..n      any failure → rollback, old tiers intact
//! COMMIT
//! ```
//!
//! Two administrators replacing the same zone's tiers concurrently: the
//! last commit wins. SQLite serializes the writes; nothing merges them.

use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use delivery_core::{Money, PricingTier, ZoneId};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct TierRow {
    min_purchase_pence: Money,
    max_purchase_pence: Money,
    base_cost_pence: Money,
}

impl TryFrom<TierRow> for PricingTier {
    type Error = DbError;

    fn try_from(row: TierRow) -> Result<Self, Self::Error> {
        PricingTier::new(row.min_purchase_pence, row.max_purchase_pence, row.base_cost_pence)
            .map_err(|e| DbError::invalid_data("pricing_tiers", e))
    }
}

/// Repository for pricing tier operations.
#[derive(Debug, Clone)]
pub struct TierRepository {
    pool: SqlitePool,
}

impl TierRepository {
    /// Creates a new TierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TierRepository { pool }
    }

    /// A zone's tiers, ascending by minimum purchase.
    pub async fn list_for_zone(&self, zone_id: ZoneId) -> DbResult<Vec<PricingTier>> {
        let rows: Vec<TierRow> = sqlx::query_as(
            r#"
            SELECT min_purchase_pence, max_purchase_pence, base_cost_pence
            FROM pricing_tiers
            WHERE zone_id = ?1
            ORDER BY min_purchase_pence ASC, id ASC
            "#,
        )
        .bind(zone_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(zone_id = %zone_id, tiers = rows.len(), "Loaded pricing tiers");
        rows.into_iter().map(PricingTier::try_from).collect()
    }

    /// Atomically replaces a zone's whole tier set.
    ///
    /// `tiers` must come from `delivery_core::validation::validate_tiers`.
    ///
    /// ## Returns
    /// The number of tiers now stored for the zone.
    pub async fn replace_for_zone(&self, zone_id: ZoneId, tiers: &[PricingTier]) -> DbResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM zones WHERE id = ?1")
            .bind(zone_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Zone", zone_id));
        }

        let removed = sqlx::query("DELETE FROM pricing_tiers WHERE zone_id = ?1")
            .bind(zone_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).in_transaction())?
            .rows_affected();

        insert_tiers(&mut tx, zone_id, tiers).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(zone_id = %zone_id, removed, inserted = tiers.len(), "Pricing tiers replaced");
        Ok(tiers.len())
    }
}

/// Inserts tiers for a zone inside the caller's transaction.
pub(crate) async fn insert_tiers(conn: &mut SqliteConnection, zone_id: ZoneId, tiers: &[PricingTier]) -> DbResult<()> {
    for tier in tiers {
        sqlx::query(
            r#"
            INSERT INTO pricing_tiers (zone_id, min_purchase_pence, max_purchase_pence, base_cost_pence)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(zone_id)
        .bind(tier.min_purchase())
        .bind(tier.max_purchase())
        .bind(tier.base_cost())
        .execute(&mut *conn)
        .await
        .map_err(|e| DbError::from(e).in_transaction())?;
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
    use delivery_core::ZoneDraft;

    fn tier(min: i64, max: i64, cost: i64) -> PricingTier {
        PricingTier::new(Money::from_pence(min), Money::from_pence(max), Money::from_pence(cost)).unwrap()
    }

    async fn setup_zone() -> (Database, ZoneId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = db
            .zones()
            .save(None, &ZoneDraft::new("Zone 1 - Local", vec!["CF".to_string()]))
            .await
            .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn test_replace_and_list_sorted() {
        let (db, id) = setup_zone().await;

        let count = db
            .tiers()
            .replace_for_zone(id, &[tier(10001, 99_999_999, 1000), tier(0, 10000, 2000)])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let tiers = db.tiers().list_for_zone(id).await.unwrap();
        assert_eq!(tiers, vec![tier(0, 10000, 2000), tier(10001, 99_999_999, 1000)]);
    }

    #[tokio::test]
    async fn test_replace_for_missing_zone() {
        let (db, _) = setup_zone().await;
        let err = db
            .tiers()
            .replace_for_zone(ZoneId::new(404), &[tier(0, 100, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_previous_tiers() {
        let (db, id) = setup_zone().await;
        let original = vec![tier(0, 10000, 2000), tier(10001, 99_999_999, 1000)];
        db.tiers().replace_for_zone(id, &original).await.unwrap();

        // Abort the third insert of the next replacement.
        sqlx::query(
            r#"
            CREATE TRIGGER fail_third_tier BEFORE INSERT ON pricing_tiers
            WHEN (SELECT COUNT(*) FROM pricing_tiers WHERE zone_id = NEW.zone_id) >= 2
            BEGIN
                SELECT RAISE(ABORT, 'injected failure');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let replacement = vec![
            tier(0, 1000, 500),
            tier(1001, 2000, 400),
            tier(2001, 3000, 300),
            tier(3001, 4000, 200),
            tier(4001, 5000, 100),
        ];
        let err = db.tiers().replace_for_zone(id, &replacement).await.unwrap_err();
        assert!(matches!(err, DbError::TransactionFailed(ref msg) if msg.contains("injected failure")));
        assert!(err.is_retryable());

        assert_eq!(db.tiers().list_for_zone(id).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_corrupt_row_surfaces_invalid_data() {
        let (db, id) = setup_zone().await;
        // A pre-CHECK database could still hold an inverted tier.
        sqlx::query("PRAGMA ignore_check_constraints = ON").execute(db.pool()).await.unwrap();
        sqlx::query("UPDATE pricing_tiers SET min_purchase_pence = 500, max_purchase_pence = 100 WHERE zone_id = ?1")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.tiers().list_for_zone(id).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidData { .. }));
    }
}
