//! Catalog database access and domain types.

pub mod product;
pub mod store;

pub use product::{Backorders, Category, Product, ProductKind, StockStatus, Variation};
pub use store::{init_schema, StoreInfo};
