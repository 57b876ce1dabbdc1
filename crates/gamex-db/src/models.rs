//! Database row types — these map directly to SQLite rows.
//! Converted into `gamex_types::Product` before leaving the crate.
use chrono::NaiveDateTime;
use gamex_types::Product;

pub(crate) const PRODUCT_COLUMNS: &str =
    r#"id, title, "desc", photo, category, created_at"#;

pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub desc: Option<String>,
    pub photo: Option<String>,
    pub category: Option<String>,
    pub created_at: Option<String>,
}

impl ProductRow {
    /// Expects the column order of `PRODUCT_COLUMNS`.
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            desc: row.get(2)?,
            photo: row.get(3)?,
            category: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            desc: row.desc.unwrap_or_default(),
            photo: row.photo.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            created_at: row.created_at.as_deref().and_then(unix_seconds),
        }
    }
}

/// SQLite `datetime('now')` text (UTC) to unix seconds.
fn unix_seconds(raw: &str) -> Option<i64> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}
