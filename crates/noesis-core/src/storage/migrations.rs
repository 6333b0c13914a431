//! Database migrations
//!
//! Schema migration definitions for the persistent store.

/// Migration definitions, applied in order against a fresh or existing
/// database.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: nodes and relations",
    up: MIGRATION_V1_UP,
}];

/// A database migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    blob TEXT NOT NULL,
    created_at REAL NOT NULL,
    trinity_e REAL NOT NULL,
    trinity_g REAL NOT NULL,
    trinity_t REAL NOT NULL,
    c_real REAL NOT NULL,
    c_imag REAL NOT NULL,
    label TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_created_at ON nodes(created_at);
CREATE INDEX IF NOT EXISTS idx_nodes_trinity ON nodes(trinity_e, trinity_g, trinity_t);
CREATE INDEX IF NOT EXISTS idx_nodes_position ON nodes(c_real, c_imag);
CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);

CREATE TABLE IF NOT EXISTS relations (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    weight REAL NOT NULL,
    metadata TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relations_source ON relations(source_id);
CREATE INDEX IF NOT EXISTS idx_relations_target ON relations(target_id);
CREATE INDEX IF NOT EXISTS idx_relations_kind ON relations(kind);
"#;

pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |_| Ok(true),
        )
        .unwrap_or(false);
    if !exists {
        return Ok(0);
    }
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .or(Ok(0))
}

/// Apply pending migrations, returning the number applied.
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!("applying migration v{}: {}", migration.version, migration.description);
            conn.execute_batch(migration.up)?;
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [migration.version])?;
            applied += 1;
        }
    }

    Ok(applied)
}
