//! # Settings Repository
//!
//! Store-wide key/value settings, values stored as JSON text.
//!
//! | Key                   | Value                                   |
//! |-----------------------|-----------------------------------------|
//! | `collection`          | `CollectionSettings`                    |
//! | `excluded_postcodes`  | `["AB", "BT"]` (normalized prefixes)    |
//! | `zone_schema_version` | `1` once the legacy import has run      |
//! | `legacy_zones`        | old option blob awaiting import         |
//! | `legacy_zones_backup` | the blob after a successful import      |

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use delivery_core::{CollectionSettings, ExcludedPostcodes};

use crate::error::DbResult;

pub const COLLECTION_KEY: &str = "collection";
pub const EXCLUDED_POSTCODES_KEY: &str = "excluded_postcodes";
pub const SCHEMA_VERSION_KEY: &str = "zone_schema_version";
pub const LEGACY_ZONES_KEY: &str = "legacy_zones";
pub const LEGACY_ZONES_BACKUP_KEY: &str = "legacy_zones_backup";

/// Repository for the `settings` table.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads and deserializes a setting. `None` if the key is unset.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let mut conn = self.pool.acquire().await?;
        get_json(&mut conn, key).await
    }

    /// Serializes and stores a setting, replacing any previous value.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        put_json(&mut conn, key, value).await
    }

    /// Removes a setting. Removing an unset key is not an error.
    pub async fn remove(&self, key: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        delete_key(&mut conn, key).await
    }

    /// Collection settings, defaults when never saved.
    pub async fn collection(&self) -> DbResult<CollectionSettings> {
        Ok(self.get(COLLECTION_KEY).await?.unwrap_or_default())
    }

    pub async fn set_collection(&self, settings: &CollectionSettings) -> DbResult<()> {
        self.set(COLLECTION_KEY, settings).await?;
        info!(enabled = settings.enabled, name = %settings.name, "Collection settings saved");
        Ok(())
    }

    /// Excluded prefixes, re-normalized on read.
    pub async fn excluded_postcodes(&self) -> DbResult<ExcludedPostcodes> {
        let prefixes: Vec<String> = self.get(EXCLUDED_POSTCODES_KEY).await?.unwrap_or_default();
        Ok(ExcludedPostcodes::new(prefixes))
    }

    pub async fn set_excluded_postcodes(&self, excluded: &ExcludedPostcodes) -> DbResult<()> {
        self.set(EXCLUDED_POSTCODES_KEY, &excluded.prefixes()).await?;
        info!(count = excluded.prefixes().len(), "Excluded postcodes saved");
        Ok(())
    }

    /// Zone data schema version; 0 when never migrated.
    pub async fn schema_version(&self) -> DbResult<u32> {
        Ok(self.get(SCHEMA_VERSION_KEY).await?.unwrap_or(0))
    }
}

// =============================================================================
// Connection Helpers
// =============================================================================

pub(crate) async fn get_json<T: DeserializeOwned>(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<T>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    debug!(key, found = raw.is_some(), "Read setting");
    raw.map(|text| serde_json::from_str(&text)).transpose().map_err(Into::into)
}

pub(crate) async fn put_json<T: Serialize + ?Sized>(conn: &mut SqliteConnection, key: &str, value: &T) -> DbResult<()> {
    let text = serde_json::to_string(value)?;

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(text)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn delete_key(conn: &mut SqliteConnection, key: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?1")
        .bind(key)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
