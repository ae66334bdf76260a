//! Catalog Sync - product catalog webhook exporter
//!
//! Formats the shop's product catalog into a JSON document and delivers it
//! to a configured HTTP endpoint, on a schedule, on operator demand, or
//! through a token-guarded trigger URL.

pub mod catalog;
pub mod delivery;
pub mod error;
pub mod formatter;
pub mod scheduler;
pub mod settings;
pub mod sync;
pub mod web;

pub use catalog::{init_schema, Product, ProductKind, StoreInfo};
pub use delivery::{DeliveryClient, DeliveryOutcome};
pub use error::{Result, SyncError};
pub use formatter::{format_all_products, ExportDocument, ProductRecord};
pub use settings::{Settings, SettingsStore, SettingsUpdate, SyncInterval};
pub use sync::{SyncEngine, SyncResult};
