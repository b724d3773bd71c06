//! # delivery-db: Configuration Store
//!
//! SQLite storage for zones, postcode patterns, pricing tiers and
//! store-wide settings, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Delivery Data Flow                               │
//! │                                                                         │
//! │  DeliveryService (resolve_delivery_options, validate_and_save_tiers)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   delivery-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ zone / tier / │    │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │◄───│   settings    │    │ + legacy.rs  │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL) or in-memory for tests                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded schema migrations
//! - [`legacy`] - One-time import of the old zone blob
//! - [`error`] - Database error types
//! - [`repository`] - Zone, tier and settings repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use delivery_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("delivery.db")).await?;
//! let snapshot = db.zones().list_enabled_with_patterns().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod legacy;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use legacy::{migrate_legacy_zones, LegacyOutcome};
pub use pool::{Database, DbConfig};

pub use repository::settings::SettingsRepository;
pub use repository::tier::TierRepository;
pub use repository::zone::ZoneRepository;
