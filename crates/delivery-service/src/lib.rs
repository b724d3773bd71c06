//! # delivery-service: Quote and Administration Layer
//!
//! Thin orchestration over [`delivery_core`] (pure rules) and
//! [`delivery_db`] (storage).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront / admin screen / delivery-quote CLI                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 delivery-service (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ServiceConfig ──► DeliveryService ──► ServiceError/ErrorCode  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                         │                                       │
//! │       ▼                         ▼                                       │
//! │  delivery-core             delivery-db                                  │
//! │  (normalize, resolve,      (zones, patterns, tiers,                    │
//! │   select tier, VAT)         settings, legacy import)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use delivery_service::{DeliveryService, ServiceConfig};
//!
//! let service = DeliveryService::connect(&ServiceConfig::load()?).await?;
//! let quote = service.resolve_delivery_options("CF10 1AA", "50.00".parse()?).await;
//! for option in quote.options() {
//!     println!("{} {}", option.name(), option.cost_inc_vat());
//! }
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorBody, ErrorCode, ServiceError, ServiceResult};
pub use service::{DeliveryService, Requote};
