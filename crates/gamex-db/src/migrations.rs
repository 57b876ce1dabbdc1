use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Catalog DB: running migration v1 (products table)");
        // AUTOINCREMENT keeps ids of deleted rows from being handed out again.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       VARCHAR(255) NOT NULL,
                "desc"      TEXT DEFAULT '',
                photo       VARCHAR(1024) DEFAULT '',
                category    VARCHAR(120) DEFAULT '',
                created_at  TEXT DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_products_created
                ON products(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            "#,
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
