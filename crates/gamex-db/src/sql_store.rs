use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use gamex_types::{Product, ProductInput};
use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use crate::models::{PRODUCT_COLUMNS, ProductRow};
use crate::{ProductStore, StoreError, Written, migrations};

/// SQLite-backed catalog. Every call holds the connection for exactly one
/// query or one transaction.
pub struct SqlStore {
    conn: Mutex<Connection>,
}

impl SqlStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    /// Run `f` inside a transaction. The transaction commits only when `f`
    /// returns `Ok`; any other exit drops it, which rolls back.
    fn with_tx<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl ProductStore for SqlStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([], ProductRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Product::from).collect())
        })
    }

    fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        self.with_conn(|conn| query_product(conn, id))
    }

    fn create_product(&self, input: &ProductInput) -> Result<Written<Product>, StoreError> {
        let fields = input.normalized();
        let product = self.with_tx(|tx| {
            tx.execute(
                // Stamped here: tables created by older deployments have no column default.
                r#"INSERT INTO products (title, "desc", photo, category, created_at)
                   VALUES (?1, ?2, ?3, ?4, datetime('now'))"#,
                (
                    &fields.title,
                    &fields.desc,
                    &fields.photo,
                    fields.category.as_str(),
                ),
            )?;
            let id = tx.last_insert_rowid();
            // Reload so the caller sees the id and timestamp SQLite assigned.
            query_product(tx, id)?.ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        })?;

        debug!("Created product {} ({})", product.id, product.title);
        Ok(Written::persisted(product))
    }

    fn update_product(
        &self,
        id: i64,
        input: &ProductInput,
    ) -> Result<Written<bool>, StoreError> {
        let fields = input.normalized();
        let updated = self.with_tx(|tx| {
            if !product_exists(tx, id)? {
                return Ok(false);
            }
            tx.execute(
                r#"UPDATE products SET title = ?1, "desc" = ?2, photo = ?3, category = ?4 WHERE id = ?5"#,
                (
                    &fields.title,
                    &fields.desc,
                    &fields.photo,
                    fields.category.as_str(),
                    id,
                ),
            )?;
            Ok(true)
        })?;

        Ok(Written::persisted(updated))
    }

    fn delete_product(&self, id: i64) -> Result<Written<bool>, StoreError> {
        let deleted = self.with_tx(|tx| {
            if !product_exists(tx, id)? {
                return Ok(false);
            }
            tx.execute("DELETE FROM products WHERE id = ?1", [id])?;
            Ok(true)
        })?;

        if deleted {
            debug!("Deleted product {}", id);
        }
        Ok(Written::persisted(deleted))
    }
}

fn query_product(conn: &Connection, id: i64) -> Result<Option<Product>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            [id],
            ProductRow::from_row,
        )
        .optional()?;

    Ok(row.map(Product::from))
}

fn product_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM products WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
