//! Product domain types.
//!
//! Rows come out of the store as raw strings and are resolved into these
//! types before formatting. Resolution is strict: a row carrying an unknown
//! product type, stock status or backorder setting is rejected, and the
//! formatter skips it instead of failing the whole export.

use serde::Serialize;

use std::collections::BTreeMap;

/// Product type, mirroring the platform's catalog taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Simple,
    Variable,
    Grouped,
    External,
}

impl ProductKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "simple" => Some(ProductKind::Simple),
            "variable" => Some(ProductKind::Variable),
            "grouped" => Some(ProductKind::Grouped),
            "external" => Some(ProductKind::External),
            _ => None,
        }
    }
}

/// Stock availability state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    OnBackorder,
}

impl StockStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "instock" => Some(StockStatus::InStock),
            "outofstock" => Some(StockStatus::OutOfStock),
            "onbackorder" => Some(StockStatus::OnBackorder),
            _ => None,
        }
    }
}

/// Backorder policy. Only the derived `allowed` flag is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backorders {
    No,
    Notify,
    Yes,
}

impl Backorders {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "no" => Some(Backorders::No),
            "notify" => Some(Backorders::Notify),
            "yes" => Some(Backorders::Yes),
            _ => None,
        }
    }

    pub fn allowed(&self) -> bool {
        !matches!(self, Backorders::No)
    }
}

/// Category assignment as stored and as exported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A fully resolved catalog product.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub kind: ProductKind,
    pub status: String,
    pub permalink: String,
    pub price: f64,
    pub regular_price: f64,
    pub sale_price: Option<f64>,
    pub stock_status: StockStatus,
    pub stock_quantity: Option<i64>,
    pub manage_stock: bool,
    pub backorders: Backorders,
    pub description: String,
    pub short_description: String,
    pub weight: String,
    pub length: String,
    pub width: String,
    pub height: String,
    pub rating_count: i64,
    pub average_rating: f64,
    pub total_sales: i64,
    pub featured_image: Option<String>,
    pub created_at: String,
}

impl Product {
    /// Purchasable right now or via backorder; only `outofstock` is not.
    pub fn in_stock(&self) -> bool {
        self.stock_status != StockStatus::OutOfStock
    }
}

/// A resolved variation of a variable product.
#[derive(Debug, Clone)]
pub struct Variation {
    pub id: i64,
    pub sku: String,
    pub price: f64,
    pub regular_price: f64,
    pub sale_price: Option<f64>,
    pub stock_quantity: Option<i64>,
    pub stock_status: StockStatus,
    pub attributes: BTreeMap<String, String>,
    pub image: Option<String>,
}

impl Variation {
    pub fn in_stock(&self) -> bool {
        self.stock_status != StockStatus::OutOfStock
    }
}

#[cfg(test)]
#[path = "product_tests.rs"]
mod tests;
