//! # Repository Module
//!
//! Repository implementations for the configuration store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DeliveryService                                                        │
//! │       │                                                                 │
//! │       │  db.zones().list_enabled_with_patterns()                       │
//! │       │  db.tiers().replace_for_zone(id, &tiers)                       │
//! │       ▼                                                                 │
//! │  ZoneRepository / TierRepository / SettingsRepository                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-table writes share `pub(crate)` helpers that take a
//! `&mut SqliteConnection`, so the legacy import can compose them inside a
//! single transaction.
//!
//! ## Available Repositories
//!
//! - [`ZoneRepository`](zone::ZoneRepository) - Zones and postcode patterns
//! - [`TierRepository`](tier::TierRepository) - Pricing tiers
//! - [`SettingsRepository`](settings::SettingsRepository) - Key/value settings

pub mod settings;
pub mod tier;
pub mod zone;
