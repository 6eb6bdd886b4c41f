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
        info!("Running migration v1 (ideas)");
        conn.execute_batch(
            "
            CREATE TABLE ideas (
                id          TEXT PRIMARY KEY,
                text        TEXT NOT NULL CHECK (length(text) BETWEEN 1 AND 280),
                upvotes     INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
                downvotes   INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL CHECK (updated_at >= created_at)
            );

            CREATE INDEX idx_ideas_created
                ON ideas(created_at DESC);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
