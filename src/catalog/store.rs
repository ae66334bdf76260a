//! Catalog database operations
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! The export pipeline only reads; writes happen out of band when the shop
//! imports its catalog.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use std::collections::BTreeMap;

use crate::catalog::product::{
    Backorders, Category, Product, ProductKind, StockStatus, Variation,
};
use crate::error::SyncError;

/// Result type for database operations
pub type DbResult<T> = rusqlite::Result<T>;

/// Shop identity embedded in every export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreInfo {
    pub name: String,
    pub url: String,
    pub currency: String,
    pub currency_symbol: String,
}

/// Initialize the catalog schema
///
/// Creates tables if they don't exist. `store_info` is a singleton row,
/// `products` holds the flat catalog, and the satellite tables carry the
/// per-product collections (variations, categories, tags, images,
/// attributes).
pub fn init_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "
        -- Shop identity (single row, id forced to 1)
        CREATE TABLE IF NOT EXISTS store_info (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            currency TEXT NOT NULL,
            currency_symbol TEXT NOT NULL
        );

        -- Flat product catalog
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            sku TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'publish',
            permalink TEXT NOT NULL,
            price REAL,
            regular_price REAL,
            sale_price REAL,
            stock_status TEXT NOT NULL DEFAULT 'instock',
            stock_quantity INTEGER,
            manage_stock INTEGER NOT NULL DEFAULT 0,
            backorders TEXT NOT NULL DEFAULT 'no',
            description TEXT NOT NULL DEFAULT '',
            short_description TEXT NOT NULL DEFAULT '',
            weight TEXT NOT NULL DEFAULT '',
            length TEXT NOT NULL DEFAULT '',
            width TEXT NOT NULL DEFAULT '',
            height TEXT NOT NULL DEFAULT '',
            rating_count INTEGER NOT NULL DEFAULT 0,
            average_rating REAL NOT NULL DEFAULT 0,
            total_sales INTEGER NOT NULL DEFAULT 0,
            featured_image TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_products_status ON products(status);
        CREATE INDEX IF NOT EXISTS idx_products_created ON products(created_at);

        -- Variations of variable products
        CREATE TABLE IF NOT EXISTS variations (
            id INTEGER PRIMARY KEY,
            parent_id INTEGER NOT NULL,
            sku TEXT NOT NULL DEFAULT '',
            price REAL,
            regular_price REAL,
            sale_price REAL,
            stock_status TEXT NOT NULL DEFAULT 'instock',
            stock_quantity INTEGER,
            image TEXT,
            FOREIGN KEY (parent_id) REFERENCES products(id)
        );

        CREATE INDEX IF NOT EXISTS idx_variations_parent ON variations(parent_id);

        -- Attribute choices pinning a variation (e.g. Size -> L)
        CREATE TABLE IF NOT EXISTS variation_attributes (
            variation_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (variation_id, name),
            FOREIGN KEY (variation_id) REFERENCES variations(id)
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS product_categories (
            product_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            PRIMARY KEY (product_id, category_id)
        );

        CREATE TABLE IF NOT EXISTS product_tags (
            product_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (product_id, name)
        );

        -- Gallery images, position 0 first
        CREATE TABLE IF NOT EXISTS product_images (
            product_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            url TEXT NOT NULL,
            PRIMARY KEY (product_id, position)
        );

        -- Product attributes; taxonomy NULL means a free-form custom attribute
        CREATE TABLE IF NOT EXISTS product_attributes (
            product_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            taxonomy TEXT,
            visible INTEGER NOT NULL DEFAULT 1,
            used_for_variations INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (product_id, position)
        );

        -- Option values per attribute; slugs for taxonomy attributes,
        -- display text for custom ones
        CREATE TABLE IF NOT EXISTS attribute_options (
            product_id INTEGER NOT NULL,
            attribute_position INTEGER NOT NULL,
            position INTEGER NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (product_id, attribute_position, position)
        );

        -- Term dictionary resolving taxonomy slugs to display names
        CREATE TABLE IF NOT EXISTS attribute_terms (
            taxonomy TEXT NOT NULL,
            slug TEXT NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (taxonomy, slug)
        );
        ",
    )?;

    log::info!("Catalog schema initialized");
    Ok(())
}

/// Load the shop identity row, if the catalog has been seeded with one.
pub fn load_store_info(conn: &Connection) -> DbResult<Option<StoreInfo>> {
    conn.query_row(
        "SELECT name, url, currency, currency_symbol FROM store_info WHERE id = 1",
        [],
        |row| {
            Ok(StoreInfo {
                name: row.get(0)?,
                url: row.get(1)?,
                currency: row.get(2)?,
                currency_symbol: row.get(3)?,
            })
        },
    )
    .optional()
}

/// Count of published products (what an export would contain).
pub fn count_published(conn: &Connection) -> DbResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM products WHERE status = 'publish'",
        [],
        |row| row.get(0),
    )
}

// ── Product Rows ───────────────────────────────────────────────────────────

/// Raw product row, before resolution into a [`Product`].
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub kind: String,
    pub status: String,
    pub permalink: String,
    pub price: Option<f64>,
    pub regular_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub stock_status: String,
    pub stock_quantity: Option<i64>,
    pub manage_stock: bool,
    pub backorders: String,
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

impl ProductRow {
    /// Resolve the raw row into a domain product.
    ///
    /// Missing prices coerce to 0.0; a sale price of 0 counts as "no sale".
    pub fn resolve(self) -> Result<Product, SyncError> {
        let kind = ProductKind::parse(&self.kind).ok_or_else(|| {
            SyncError::InvalidProduct(format!(
                "product {}: unknown product type '{}'",
                self.id, self.kind
            ))
        })?;
        let stock_status = StockStatus::parse(&self.stock_status).ok_or_else(|| {
            SyncError::InvalidProduct(format!(
                "product {}: unknown stock status '{}'",
                self.id, self.stock_status
            ))
        })?;
        let backorders = Backorders::parse(&self.backorders).ok_or_else(|| {
            SyncError::InvalidProduct(format!(
                "product {}: unknown backorders setting '{}'",
                self.id, self.backorders
            ))
        })?;

        Ok(Product {
            id: self.id,
            name: self.name,
            slug: self.slug,
            sku: self.sku,
            kind,
            status: self.status,
            permalink: self.permalink,
            price: self.price.unwrap_or(0.0),
            regular_price: self.regular_price.unwrap_or(0.0),
            sale_price: self.sale_price.filter(|price| *price != 0.0),
            stock_status,
            stock_quantity: self.stock_quantity,
            manage_stock: self.manage_stock,
            backorders,
            description: self.description,
            short_description: self.short_description,
            weight: self.weight,
            length: self.length,
            width: self.width,
            height: self.height,
            rating_count: self.rating_count,
            average_rating: self.average_rating,
            total_sales: self.total_sales,
            featured_image: self.featured_image,
            created_at: self.created_at,
        })
    }
}

/// All published products, newest first (ties broken by id, descending).
pub fn all_published(conn: &Connection) -> DbResult<Vec<ProductRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, slug, sku, kind, status, permalink,
                price, regular_price, sale_price,
                stock_status, stock_quantity, manage_stock, backorders,
                description, short_description,
                weight, length, width, height,
                rating_count, average_rating, total_sales,
                featured_image, created_at
         FROM products
         WHERE status = 'publish'
         ORDER BY created_at DESC, id DESC",
    )?;

    let rows: DbResult<Vec<ProductRow>> = stmt
        .query_map([], |row| {
            Ok(ProductRow {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
                sku: row.get(3)?,
                kind: row.get(4)?,
                status: row.get(5)?,
                permalink: row.get(6)?,
                price: row.get(7)?,
                regular_price: row.get(8)?,
                sale_price: row.get(9)?,
                stock_status: row.get(10)?,
                stock_quantity: row.get(11)?,
                manage_stock: row.get(12)?,
                backorders: row.get(13)?,
                description: row.get(14)?,
                short_description: row.get(15)?,
                weight: row.get(16)?,
                length: row.get(17)?,
                width: row.get(18)?,
                height: row.get(19)?,
                rating_count: row.get(20)?,
                average_rating: row.get(21)?,
                total_sales: row.get(22)?,
                featured_image: row.get(23)?,
                created_at: row.get(24)?,
            })
        })?
        .collect();
    rows
}

// ── Per-Product Collections ────────────────────────────────────────────────

/// Categories assigned to a product, alphabetical by name.
pub fn categories_for(conn: &Connection, product_id: i64) -> DbResult<Vec<Category>> {
    let mut stmt = conn.prepare_cached(
        "SELECT c.id, c.name, c.slug
         FROM categories c
         JOIN product_categories pc ON pc.category_id = c.id
         WHERE pc.product_id = ?1
         ORDER BY c.name ASC",
    )?;

    let rows: DbResult<Vec<Category>> = stmt
        .query_map(params![product_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
            })
        })?
        .collect();
    rows
}

/// Tag names assigned to a product, alphabetical.
pub fn tags_for(conn: &Connection, product_id: i64) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT name FROM product_tags WHERE product_id = ?1 ORDER BY name ASC",
    )?;

    let rows: DbResult<Vec<String>> = stmt
        .query_map(params![product_id], |row| row.get(0))?
        .collect();
    rows
}

/// Gallery image URLs in gallery order (the featured image is separate).
pub fn gallery_for(conn: &Connection, product_id: i64) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT url FROM product_images WHERE product_id = ?1 ORDER BY position ASC",
    )?;

    let rows: DbResult<Vec<String>> = stmt
        .query_map(params![product_id], |row| row.get(0))?
        .collect();
    rows
}

/// Product attribute with its raw option values.
#[derive(Debug, Clone)]
pub struct AttributeRow {
    pub name: String,
    pub taxonomy: Option<String>,
    pub visible: bool,
    pub used_for_variations: bool,
    pub options: Vec<String>,
}

/// Attributes of a product in display order, each with its options in
/// display order. Taxonomy attributes carry option slugs which the
/// formatter resolves through [`term_name`].
pub fn attributes_for(conn: &Connection, product_id: i64) -> DbResult<Vec<AttributeRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT position, name, taxonomy, visible, used_for_variations
         FROM product_attributes
         WHERE product_id = ?1
         ORDER BY position ASC",
    )?;

    let heads: DbResult<Vec<(i64, String, Option<String>, bool, bool)>> = stmt
        .query_map(params![product_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect();

    let mut options_stmt = conn.prepare_cached(
        "SELECT value FROM attribute_options
         WHERE product_id = ?1 AND attribute_position = ?2
         ORDER BY position ASC",
    )?;

    let mut attributes = Vec::new();
    for (position, name, taxonomy, visible, used_for_variations) in heads? {
        let options: DbResult<Vec<String>> = options_stmt
            .query_map(params![product_id, position], |row| row.get(0))?
            .collect();
        attributes.push(AttributeRow {
            name,
            taxonomy,
            visible,
            used_for_variations,
            options: options?,
        });
    }
    Ok(attributes)
}

/// Display name for a taxonomy term slug, if the term exists.
pub fn term_name(conn: &Connection, taxonomy: &str, slug: &str) -> DbResult<Option<String>> {
    conn.query_row(
        "SELECT name FROM attribute_terms WHERE taxonomy = ?1 AND slug = ?2",
        params![taxonomy, slug],
        |row| row.get(0),
    )
    .optional()
}

// ── Variations ─────────────────────────────────────────────────────────────

/// Raw variation row, before resolution into a [`Variation`].
#[derive(Debug, Clone)]
pub struct VariationRow {
    pub id: i64,
    pub sku: String,
    pub price: Option<f64>,
    pub regular_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub stock_status: String,
    pub stock_quantity: Option<i64>,
    pub image: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl VariationRow {
    /// Resolve the raw row into a domain variation.
    pub fn resolve(self) -> Result<Variation, SyncError> {
        let stock_status = StockStatus::parse(&self.stock_status).ok_or_else(|| {
            SyncError::InvalidProduct(format!(
                "variation {}: unknown stock status '{}'",
                self.id, self.stock_status
            ))
        })?;

        Ok(Variation {
            id: self.id,
            sku: self.sku,
            price: self.price.unwrap_or(0.0),
            regular_price: self.regular_price.unwrap_or(0.0),
            sale_price: self.sale_price.filter(|price| *price != 0.0),
            stock_quantity: self.stock_quantity,
            stock_status,
            attributes: self.attributes,
            image: self.image,
        })
    }
}

/// Variations of a variable product in id order, each with its pinned
/// attribute choices.
pub fn variations_for(conn: &Connection, product_id: i64) -> DbResult<Vec<VariationRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, sku, price, regular_price, sale_price,
                stock_status, stock_quantity, image
         FROM variations
         WHERE parent_id = ?1
         ORDER BY id ASC",
    )?;

    let skeletons: DbResult<Vec<VariationRow>> = stmt
        .query_map(params![product_id], |row| {
            Ok(VariationRow {
                id: row.get(0)?,
                sku: row.get(1)?,
                price: row.get(2)?,
                regular_price: row.get(3)?,
                sale_price: row.get(4)?,
                stock_status: row.get(5)?,
                stock_quantity: row.get(6)?,
                image: row.get(7)?,
                attributes: BTreeMap::new(),
            })
        })?
        .collect();

    let mut attr_stmt = conn.prepare_cached(
        "SELECT name, value FROM variation_attributes WHERE variation_id = ?1",
    )?;

    let mut variations = skeletons?;
    for variation in &mut variations {
        let pairs: DbResult<Vec<(String, String)>> = attr_stmt
            .query_map(params![variation.id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect();
        variation.attributes = pairs?.into_iter().collect();
    }
    Ok(variations)
}

#[cfg(test)]
pub use tests::{
    insert_product_row, insert_variation_attribute, insert_variation_row, seed_store_info, test_db,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Create an in-memory catalog for testing
    pub fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    pub fn seed_store_info(conn: &Connection) {
        conn.execute(
            "INSERT OR REPLACE INTO store_info (id, name, url, currency, currency_symbol)
             VALUES (1, 'Demo Store', 'https://shop.example', 'EUR', '€')",
            [],
        )
        .unwrap();
    }

    /// Insert a published product with sensible defaults; price doubles as
    /// the regular price, everything else stays empty.
    pub fn insert_product_row(
        conn: &Connection,
        id: i64,
        name: &str,
        kind: &str,
        price: f64,
        created_at: &str,
    ) {
        let slug = name.to_lowercase().replace(' ', "-");
        conn.execute(
            "INSERT INTO products (id, name, slug, sku, kind, status, permalink,
                                   price, regular_price, stock_status, backorders, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'publish', ?6, ?7, ?7, 'instock', 'no', ?8)",
            params![
                id,
                name,
                slug,
                format!("SKU-{}", id),
                kind,
                format!("https://shop.example/product/{}", slug),
                price,
                created_at
            ],
        )
        .unwrap();
    }

    pub fn insert_variation_row(conn: &Connection, id: i64, parent_id: i64, price: f64) {
        conn.execute(
            "INSERT INTO variations (id, parent_id, sku, price, regular_price, stock_status)
             VALUES (?1, ?2, ?3, ?4, ?4, 'instock')",
            params![id, parent_id, format!("VAR-{}", id), price],
        )
        .unwrap();
    }

    pub fn insert_variation_attribute(
        conn: &Connection,
        variation_id: i64,
        name: &str,
        value: &str,
    ) {
        conn.execute(
            "INSERT INTO variation_attributes (variation_id, name, value) VALUES (?1, ?2, ?3)",
            params![variation_id, name, value],
        )
        .unwrap();
    }

    #[test]
    fn init_schema_creates_tables() {
        let conn = test_db();

        for table in [
            "store_info",
            "products",
            "variations",
            "variation_attributes",
            "categories",
            "product_categories",
            "product_tags",
            "product_images",
            "product_attributes",
            "attribute_options",
            "attribute_terms",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {}", table);
        }
    }

    #[test]
    fn init_schema_is_idempotent() {
        let conn = test_db();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn store_info_loads_seeded_row() {
        let conn = test_db();
        assert_eq!(load_store_info(&conn).unwrap(), None);

        seed_store_info(&conn);
        let info = load_store_info(&conn).unwrap().unwrap();
        assert_eq!(info.name, "Demo Store");
        assert_eq!(info.currency, "EUR");
        assert_eq!(info.currency_symbol, "€");
    }

    #[test]
    fn all_published_skips_drafts() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Visible", "simple", 10.0, "2026-01-02 10:00:00");
        insert_product_row(&conn, 2, "Hidden", "simple", 10.0, "2026-01-03 10:00:00");
        conn.execute("UPDATE products SET status = 'draft' WHERE id = 2", [])
            .unwrap();

        let rows = all_published(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
        assert_eq!(count_published(&conn).unwrap(), 1);
    }

    #[test]
    fn all_published_orders_newest_first() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Old", "simple", 10.0, "2026-01-01 10:00:00");
        insert_product_row(&conn, 2, "New", "simple", 10.0, "2026-01-05 10:00:00");
        // Same timestamp as id 2; higher id wins the tie
        insert_product_row(&conn, 3, "Tie", "simple", 10.0, "2026-01-05 10:00:00");

        let ids: Vec<i64> = all_published(&conn).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn resolve_rejects_unknown_kind() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Odd", "bundle", 10.0, "2026-01-01 10:00:00");

        let row = all_published(&conn).unwrap().remove(0);
        let err = row.resolve().unwrap_err();
        assert!(err.to_string().contains("unknown product type 'bundle'"));
    }

    #[test]
    fn resolve_rejects_unknown_stock_status() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Odd", "simple", 10.0, "2026-01-01 10:00:00");
        conn.execute("UPDATE products SET stock_status = 'maybe' WHERE id = 1", [])
            .unwrap();

        let row = all_published(&conn).unwrap().remove(0);
        assert!(row.resolve().is_err());
    }

    #[test]
    fn resolve_rejects_unknown_backorders() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Odd", "simple", 10.0, "2026-01-01 10:00:00");
        conn.execute("UPDATE products SET backorders = 'sometimes' WHERE id = 1", [])
            .unwrap();

        let row = all_published(&conn).unwrap().remove(0);
        assert!(row.resolve().is_err());
    }

    #[test]
    fn resolve_coerces_missing_prices_to_zero() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Free", "simple", 1.0, "2026-01-01 10:00:00");
        conn.execute(
            "UPDATE products SET price = NULL, regular_price = NULL WHERE id = 1",
            [],
        )
        .unwrap();

        let product = all_published(&conn).unwrap().remove(0).resolve().unwrap();
        assert_eq!(product.price, 0.0);
        assert_eq!(product.regular_price, 0.0);
        assert_eq!(product.sale_price, None);
    }

    #[test]
    fn resolve_treats_zero_sale_price_as_no_sale() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Deal", "simple", 10.0, "2026-01-01 10:00:00");
        conn.execute("UPDATE products SET sale_price = 0 WHERE id = 1", [])
            .unwrap();

        let product = all_published(&conn).unwrap().remove(0).resolve().unwrap();
        assert_eq!(product.sale_price, None);

        conn.execute("UPDATE products SET sale_price = 7.5 WHERE id = 1", [])
            .unwrap();
        let product = all_published(&conn).unwrap().remove(0).resolve().unwrap();
        assert_eq!(product.sale_price, Some(7.5));
    }

    #[test]
    fn categories_ordered_by_name() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Shirt", "simple", 10.0, "2026-01-01 10:00:00");
        conn.execute_batch(
            "INSERT INTO categories (id, name, slug) VALUES (10, 'Zubehör', 'zubehoer');
             INSERT INTO categories (id, name, slug) VALUES (11, 'Apparel', 'apparel');
             INSERT INTO product_categories (product_id, category_id) VALUES (1, 10);
             INSERT INTO product_categories (product_id, category_id) VALUES (1, 11);",
        )
        .unwrap();

        let names: Vec<String> = categories_for(&conn, 1)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Apparel", "Zubehör"]);
    }

    #[test]
    fn tags_ordered_by_name() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Shirt", "simple", 10.0, "2026-01-01 10:00:00");
        conn.execute_batch(
            "INSERT INTO product_tags (product_id, name) VALUES (1, 'summer');
             INSERT INTO product_tags (product_id, name) VALUES (1, 'cotton');",
        )
        .unwrap();

        assert_eq!(tags_for(&conn, 1).unwrap(), vec!["cotton", "summer"]);
    }

    #[test]
    fn gallery_ordered_by_position() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Shirt", "simple", 10.0, "2026-01-01 10:00:00");
        conn.execute_batch(
            "INSERT INTO product_images (product_id, position, url) VALUES (1, 1, 'https://img/second');
             INSERT INTO product_images (product_id, position, url) VALUES (1, 0, 'https://img/first');",
        )
        .unwrap();

        assert_eq!(
            gallery_for(&conn, 1).unwrap(),
            vec!["https://img/first", "https://img/second"]
        );
    }

    #[test]
    fn attributes_keep_display_order() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Shirt", "variable", 10.0, "2026-01-01 10:00:00");
        conn.execute_batch(
            "INSERT INTO product_attributes (product_id, position, name, taxonomy, visible, used_for_variations)
             VALUES (1, 0, 'Size', 'pa_size', 1, 1);
             INSERT INTO product_attributes (product_id, position, name, taxonomy, visible, used_for_variations)
             VALUES (1, 1, 'Material', NULL, 1, 0);
             INSERT INTO attribute_options (product_id, attribute_position, position, value)
             VALUES (1, 0, 0, 'small');
             INSERT INTO attribute_options (product_id, attribute_position, position, value)
             VALUES (1, 0, 1, 'large');
             INSERT INTO attribute_options (product_id, attribute_position, position, value)
             VALUES (1, 1, 0, 'Cotton');",
        )
        .unwrap();

        let attributes = attributes_for(&conn, 1).unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].name, "Size");
        assert_eq!(attributes[0].taxonomy.as_deref(), Some("pa_size"));
        assert!(attributes[0].used_for_variations);
        assert_eq!(attributes[0].options, vec!["small", "large"]);
        assert_eq!(attributes[1].name, "Material");
        assert_eq!(attributes[1].taxonomy, None);
        assert_eq!(attributes[1].options, vec!["Cotton"]);
    }

    #[test]
    fn term_name_resolves_known_slugs() {
        let conn = test_db();
        conn.execute(
            "INSERT INTO attribute_terms (taxonomy, slug, name) VALUES ('pa_size', 'small', 'Small')",
            [],
        )
        .unwrap();

        assert_eq!(
            term_name(&conn, "pa_size", "small").unwrap(),
            Some("Small".to_string())
        );
        assert_eq!(term_name(&conn, "pa_size", "huge").unwrap(), None);
    }

    #[test]
    fn variations_carry_attribute_map() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Shirt", "variable", 10.0, "2026-01-01 10:00:00");
        insert_variation_row(&conn, 100, 1, 12.5);
        insert_variation_row(&conn, 101, 1, 14.0);
        insert_variation_attribute(&conn, 100, "Size", "S");
        insert_variation_attribute(&conn, 100, "Color", "Red");

        let variations = variations_for(&conn, 1).unwrap();
        assert_eq!(variations.len(), 2);
        assert_eq!(variations[0].id, 100);
        assert_eq!(variations[0].attributes.len(), 2);
        assert_eq!(variations[0].attributes["Size"], "S");
        assert_eq!(variations[0].attributes["Color"], "Red");
        assert!(variations[1].attributes.is_empty());
    }

    #[test]
    fn variation_resolve_rejects_unknown_stock_status() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Shirt", "variable", 10.0, "2026-01-01 10:00:00");
        insert_variation_row(&conn, 100, 1, 12.5);
        conn.execute(
            "UPDATE variations SET stock_status = 'unknown' WHERE id = 100",
            [],
        )
        .unwrap();

        let row = variations_for(&conn, 1).unwrap().remove(0);
        assert!(row.resolve().is_err());
    }

    #[test]
    fn variation_zero_sale_price_is_no_sale() {
        let conn = test_db();
        insert_product_row(&conn, 1, "Shirt", "variable", 10.0, "2026-01-01 10:00:00");
        insert_variation_row(&conn, 100, 1, 12.5);
        conn.execute("UPDATE variations SET sale_price = 0 WHERE id = 100", [])
            .unwrap();

        let variation = variations_for(&conn, 1).unwrap().remove(0).resolve().unwrap();
        assert_eq!(variation.sale_price, None);
    }
}
