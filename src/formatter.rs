//! Builds the export document delivered to the destination endpoint.
//!
//! The record layout is part of the external contract: consumers key on the
//! field names and on `sale_price` being an explicit null when no sale is
//! running. Optional sections (categories, tags, images, variations) are
//! omitted entirely when the corresponding include flag is off, not sent as
//! empty collections.

use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;

use std::collections::BTreeMap;

use chrono::{Local, SecondsFormat};

use crate::catalog::product::{Category, Product, ProductKind, StockStatus};
use crate::catalog::store::{self, StoreInfo};
use crate::error::Result;
use crate::settings::Settings;

/// Full export payload.
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub generated_at: String,
    pub store_info: StoreInfo,
    pub total_count: usize,
    pub products: Vec<ProductRecord>,
}

/// One formatted product. Field order is stable.
#[derive(Debug, Serialize)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    #[serde(rename = "type")]
    pub kind: ProductKind,
    pub status: String,
    pub permalink: String,
    pub price: f64,
    pub regular_price: f64,
    pub sale_price: Option<f64>,
    pub on_sale: bool,
    pub stock_status: StockStatus,
    pub stock_quantity: Option<i64>,
    pub manage_stock: bool,
    pub in_stock: bool,
    pub backorders_allowed: bool,
    pub description: String,
    pub short_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    pub attributes: Vec<AttributeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variations: Option<Vec<VariationRecord>>,
    pub weight: String,
    pub dimensions: Dimensions,
    pub rating_count: i64,
    pub average_rating: f64,
    pub total_sales: i64,
}

/// Physical dimensions, kept as the free-text values the shop stores.
#[derive(Debug, Serialize)]
pub struct Dimensions {
    pub length: String,
    pub width: String,
    pub height: String,
}

/// Product attribute with display-ready option names.
#[derive(Debug, Serialize)]
pub struct AttributeRecord {
    pub name: String,
    pub visible: bool,
    pub variation: bool,
    pub options: Vec<String>,
}

/// One variation of a variable product.
#[derive(Debug, Serialize)]
pub struct VariationRecord {
    pub id: i64,
    pub sku: String,
    pub price: f64,
    pub regular_price: f64,
    pub sale_price: Option<f64>,
    pub stock_quantity: Option<i64>,
    pub stock_status: StockStatus,
    pub in_stock: bool,
    pub attributes: BTreeMap<String, String>,
    pub image: Option<String>,
}

/// Format the whole published catalog into an export document.
///
/// Rows that fail to resolve are logged and skipped; `total_count` reflects
/// what actually made it into the document. Database errors abort the export.
pub fn format_all_products(conn: &Connection, settings: &Settings) -> Result<ExportDocument> {
    let store_info = store::load_store_info(conn)?.unwrap_or_default();
    let rows = store::all_published(conn)?;
    let mut products = Vec::with_capacity(rows.len());

    for row in rows {
        let id = row.id;
        let product = match row.resolve() {
            Ok(product) => product,
            Err(e) => {
                log::warn!("Skipping product {}: {}", id, e);
                continue;
            }
        };
        products.push(format_product(conn, product, settings)?);
    }

    Ok(ExportDocument {
        generated_at: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        store_info,
        total_count: products.len(),
        products,
    })
}

fn format_product(conn: &Connection, product: Product, settings: &Settings) -> Result<ProductRecord> {
    let id = product.id;

    let (categories, tags) = if settings.include_categories {
        (
            Some(store::categories_for(conn, id)?),
            Some(store::tags_for(conn, id)?),
        )
    } else {
        (None, None)
    };

    // The featured image leads the gallery, like the shop page shows it
    let (images, featured_image) = if settings.include_images {
        let mut images = Vec::new();
        if let Some(featured) = &product.featured_image {
            images.push(featured.clone());
        }
        images.extend(store::gallery_for(conn, id)?);
        (Some(images), product.featured_image.clone())
    } else {
        (None, None)
    };

    let attributes = format_attributes(conn, id)?;

    let variations = if settings.include_variations && product.kind == ProductKind::Variable {
        Some(format_variations(conn, id)?)
    } else {
        None
    };

    let on_sale = product.sale_price.is_some();
    let in_stock = product.in_stock();
    let backorders_allowed = product.backorders.allowed();
    let description = strip_tags(&product.description);
    let short_description = strip_tags(&product.short_description);

    Ok(ProductRecord {
        id,
        name: product.name,
        slug: product.slug,
        sku: product.sku,
        kind: product.kind,
        status: product.status,
        permalink: product.permalink,
        price: product.price,
        regular_price: product.regular_price,
        sale_price: product.sale_price,
        on_sale,
        stock_status: product.stock_status,
        stock_quantity: product.stock_quantity,
        manage_stock: product.manage_stock,
        in_stock,
        backorders_allowed,
        description,
        short_description,
        categories,
        tags,
        images,
        featured_image,
        attributes,
        variations,
        weight: product.weight,
        dimensions: Dimensions {
            length: product.length,
            width: product.width,
            height: product.height,
        },
        rating_count: product.rating_count,
        average_rating: product.average_rating,
        total_sales: product.total_sales,
    })
}

/// Taxonomy option slugs become display names; slugs without a matching term
/// are dropped. Custom attributes pass their values through untouched.
fn format_attributes(conn: &Connection, product_id: i64) -> Result<Vec<AttributeRecord>> {
    let rows = store::attributes_for(conn, product_id)?;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let options = match row.taxonomy.as_deref() {
            Some(taxonomy) => {
                let mut resolved = Vec::with_capacity(row.options.len());
                for slug in &row.options {
                    if let Some(name) = store::term_name(conn, taxonomy, slug)? {
                        resolved.push(name);
                    }
                }
                resolved
            }
            None => row.options,
        };
        records.push(AttributeRecord {
            name: row.name,
            visible: row.visible,
            variation: row.used_for_variations,
            options,
        });
    }
    Ok(records)
}

fn format_variations(conn: &Connection, parent_id: i64) -> Result<Vec<VariationRecord>> {
    let rows = store::variations_for(conn, parent_id)?;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let id = row.id;
        let variation = match row.resolve() {
            Ok(variation) => variation,
            Err(e) => {
                log::warn!("Skipping variation {}: {}", id, e);
                continue;
            }
        };
        let in_stock = variation.in_stock();
        records.push(VariationRecord {
            id: variation.id,
            sku: variation.sku,
            price: variation.price,
            regular_price: variation.regular_price,
            sale_price: variation.sale_price,
            stock_quantity: variation.stock_quantity,
            stock_status: variation.stock_status,
            in_stock,
            attributes: variation.attributes,
            image: variation.image,
        });
    }
    Ok(records)
}

lazy_static! {
    static ref SCRIPT_STYLE: Regex =
        Regex::new(r"(?is)<script[^>]*>.*?</script>|<style[^>]*>.*?</style>").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
}

/// Reduce stored markup to plain text. Script and style blocks are dropped
/// whole, remaining tags are removed, surrounding whitespace is trimmed.
/// Entities are left as stored.
pub fn strip_tags(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE.replace_all(html, "");
    TAG.replace_all(&without_blocks, "").trim().to_string()
}

#[cfg(test)]
#[path = "formatter_tests.rs"]
mod tests;
