//! SQLite-backed persistent store
//!
//! Separate writer/reader connections behind mutexes for interior
//! mutability, PRAGMAs applied once per connection, migrations run on open,
//! and a path resolved via `directories::ProjectDirs` when the caller
//! doesn't pin an absolute one. Falls back to an in-memory `Ephemeral`
//! backend when the store directory can't be created or persistence is
//! disabled outright.

use crate::node::{Direction, OntologicalNode, Relation};
use crate::value::{FractalPosition, TrinityVector};
use chrono::{DateTime, TimeZone, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Storage-layer error type.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("missing relation endpoint: {0}")]
    MissingEndpoint(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupted record {0}: {1}")]
    Corrupted(String, serde_json::Error),
    #[error("initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The serialized payload of a node's `blob` column: everything but id and
/// the outgoing relations, which are reconstructed from the `relations`
/// table.
#[derive(Debug, Serialize, Deserialize)]
struct NodeBlob {
    label: String,
    trinity: TrinityVector,
    position: FractalPosition,
    created_at_secs: f64,
    payload: HashMap<String, JsonValue>,
}

impl NodeBlob {
    fn from_node(node: &OntologicalNode) -> Self {
        Self {
            label: node.label().to_string(),
            trinity: *node.trinity(),
            position: *node.position(),
            created_at_secs: node.created_at().timestamp() as f64,
            payload: node.payload().clone(),
        }
    }

    fn into_node(self, id: String, relations: Vec<Relation>) -> Result<OntologicalNode> {
        let created_at = Utc
            .timestamp_opt(self.created_at_secs as i64, 0)
            .single()
            .ok_or_else(|| StoreError::Init(format!("invalid timestamp for node {id}")))?;
        Ok(OntologicalNode::from_parts(id, self.label, self.trinity, self.position, created_at, self.payload, relations))
    }
}

enum Backend {
    Persistent { writer: Mutex<Connection>, reader: Mutex<Connection> },
    Ephemeral {
        nodes: Mutex<HashMap<String, (NodeBlob, DateTime<Utc>)>>,
        relations: Mutex<HashMap<String, Relation>>,
    },
}

/// Durable storage of nodes and relations.
pub struct Store {
    backend: Backend,
}

impl Store {
    /// Open (or create) the store at `store_path`. If `persistence_enabled`
    /// is false, or the backing directory can't be created, runs in
    /// ephemeral mode: all operations succeed against in-memory state but
    /// nothing is written to disk.
    pub fn open(store_path: &str, persistence_enabled: bool) -> Self {
        if !persistence_enabled {
            tracing::info!("persistence disabled by configuration, running ephemeral");
            return Self::ephemeral();
        }

        match Self::open_persistent(store_path) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!("failed to open persistent store at {store_path}: {err}, falling back to ephemeral mode");
                Self::ephemeral()
            }
        }
    }

    fn ephemeral() -> Self {
        Self {
            backend: Backend::Ephemeral {
                nodes: Mutex::new(HashMap::new()),
                relations: Mutex::new(HashMap::new()),
            },
        }
    }

    fn open_persistent(store_path: &str) -> Result<Self> {
        let path = resolve_path(store_path)?;

        let writer_conn = Connection::open(&path)?;
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            backend: Backend::Persistent {
                writer: Mutex::new(writer_conn),
                reader: Mutex::new(reader_conn),
            },
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self.backend, Backend::Ephemeral { .. })
    }

    /// Insert or replace `node` by id, atomically.
    pub fn put_node(&self, node: &OntologicalNode) -> Result<()> {
        match &self.backend {
            Backend::Persistent { writer, .. } => {
                let blob = NodeBlob::from_node(node);
                let blob_json = serde_json::to_string(&blob).expect("NodeBlob serializes");
                let conn = writer.lock().expect("writer lock poisoned");
                conn.execute(
                    "INSERT INTO nodes (id, blob, created_at, trinity_e, trinity_g, trinity_t, c_real, c_imag, label)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(id) DO UPDATE SET
                        blob = excluded.blob, created_at = excluded.created_at,
                        trinity_e = excluded.trinity_e, trinity_g = excluded.trinity_g, trinity_t = excluded.trinity_t,
                        c_real = excluded.c_real, c_imag = excluded.c_imag, label = excluded.label",
                    params![
                        node.id(),
                        blob_json,
                        node.created_at().timestamp() as f64,
                        node.trinity().existence(),
                        node.trinity().goodness(),
                        node.trinity().truth(),
                        node.position().c_real(),
                        node.position().c_imag(),
                        node.label(),
                    ],
                )?;
                Ok(())
            }
            Backend::Ephemeral { nodes, .. } => {
                let blob = NodeBlob::from_node(node);
                nodes.lock().expect("node map lock poisoned").insert(node.id().to_string(), (blob, node.created_at()));
                Ok(())
            }
        }
    }

    /// Return the node with its outgoing relations populated, or `None`.
    pub fn get_node(&self, id: &str) -> Result<Option<OntologicalNode>> {
        match &self.backend {
            Backend::Persistent { reader, .. } => {
                let conn = reader.lock().expect("reader lock poisoned");
                let row: Option<String> =
                    conn.query_row("SELECT blob FROM nodes WHERE id = ?1", params![id], |row| row.get(0)).optional()?;
                let Some(blob_json) = row else { return Ok(None) };
                let blob: NodeBlob = match serde_json::from_str(&blob_json) {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!("corrupted node blob for {id}: {e}, treating as absent");
                        return Ok(None);
                    }
                };
                drop(conn);
                let relations = self.list_relations_inner(id, None, Direction::Outgoing)?;
                Ok(Some(blob.into_node(id.to_string(), relations)?))
            }
            Backend::Ephemeral { nodes, .. } => {
                let Some((blob, created_at)) = nodes.lock().expect("node map lock poisoned").get(id).map(|(b, c)| (clone_blob(b), *c)) else {
                    return Ok(None);
                };
                let _ = created_at;
                let relations = self.list_relations_inner(id, None, Direction::Outgoing)?;
                Ok(Some(blob.into_node(id.to_string(), relations)?))
            }
        }
    }

    /// Remove a node, cascading relations.
    pub fn delete_node(&self, id: &str) -> Result<()> {
        match &self.backend {
            Backend::Persistent { writer, .. } => {
                let conn = writer.lock().expect("writer lock poisoned");
                conn.execute("DELETE FROM nodes WHERE id = ?1", params![id])?;
                Ok(())
            }
            Backend::Ephemeral { nodes, relations } => {
                nodes.lock().expect("node map lock poisoned").remove(id);
                relations.lock().expect("relation map lock poisoned").retain(|_, r| r.source_id != id && r.target_id != id);
                Ok(())
            }
        }
    }

    fn node_exists(&self, id: &str) -> Result<bool> {
        match &self.backend {
            Backend::Persistent { reader, .. } => {
                let conn = reader.lock().expect("reader lock poisoned");
                let exists: Option<i64> =
                    conn.query_row("SELECT 1 FROM nodes WHERE id = ?1", params![id], |row| row.get(0)).optional()?;
                Ok(exists.is_some())
            }
            Backend::Ephemeral { nodes, .. } => Ok(nodes.lock().expect("node map lock poisoned").contains_key(id)),
        }
    }

    /// Insert or replace a relation. Fails with `MissingEndpoint` if either
    /// endpoint is absent.
    pub fn put_relation(&self, rel: &Relation) -> Result<()> {
        if !self.node_exists(&rel.source_id)? {
            return Err(StoreError::MissingEndpoint(rel.source_id.clone()));
        }
        if !self.node_exists(&rel.target_id)? {
            return Err(StoreError::MissingEndpoint(rel.target_id.clone()));
        }

        match &self.backend {
            Backend::Persistent { writer, .. } => {
                let metadata_json = serde_json::to_string(&rel.metadata).expect("metadata serializes");
                let conn = writer.lock().expect("writer lock poisoned");
                conn.execute(
                    "INSERT INTO relations (id, source_id, target_id, kind, weight, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET weight = excluded.weight, metadata = excluded.metadata",
                    params![rel.id, rel.source_id, rel.target_id, rel.kind, rel.weight, metadata_json],
                )?;
                Ok(())
            }
            Backend::Ephemeral { relations, .. } => {
                relations.lock().expect("relation map lock poisoned").insert(rel.id.clone(), rel.clone());
                Ok(())
            }
        }
    }

    /// Relations matching `id` per `direction`, optionally filtered by
    /// `kind`.
    pub fn list_relations(&self, id: &str, kind: Option<&str>, direction: Direction) -> Result<Vec<Relation>> {
        self.list_relations_inner(id, kind, direction)
    }

    fn list_relations_inner(&self, id: &str, kind: Option<&str>, direction: Direction) -> Result<Vec<Relation>> {
        match &self.backend {
            Backend::Persistent { reader, .. } => {
                let conn = reader.lock().expect("reader lock poisoned");
                let mut out = Vec::new();
                if matches!(direction, Direction::Outgoing | Direction::Both) {
                    out.extend(query_relations(&conn, "source_id", id, kind)?);
                }
                if matches!(direction, Direction::Incoming | Direction::Both) {
                    out.extend(query_relations(&conn, "target_id", id, kind)?);
                }
                Ok(out)
            }
            Backend::Ephemeral { relations, .. } => {
                let relations = relations.lock().expect("relation map lock poisoned");
                Ok(relations
                    .values()
                    .filter(|r| match direction {
                        Direction::Outgoing => r.source_id == id,
                        Direction::Incoming => r.target_id == id,
                        Direction::Both => r.source_id == id || r.target_id == id,
                    })
                    .filter(|r| kind.is_none_or(|k| r.kind == k))
                    .cloned()
                    .collect())
            }
        }
    }

    /// Every node currently in the store, relations populated. Used to
    /// rebuild the spatial indices on open.
    pub fn all_nodes(&self) -> Result<Vec<OntologicalNode>> {
        let ids: Vec<String> = match &self.backend {
            Backend::Persistent { reader, .. } => {
                let conn = reader.lock().expect("reader lock poisoned");
                let mut stmt = conn.prepare("SELECT id FROM nodes")?;
                stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<std::result::Result<Vec<_>, _>>()?
            }
            Backend::Ephemeral { nodes, .. } => nodes.lock().expect("node map lock poisoned").keys().cloned().collect(),
        };

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get_node(&id)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    /// Up to `limit` ids whose label contains `substring` (case-insensitive).
    pub fn find_by_label(&self, substring: &str, limit: usize) -> Result<Vec<String>> {
        match &self.backend {
            Backend::Persistent { reader, .. } => {
                let conn = reader.lock().expect("reader lock poisoned");
                let pattern = format!("%{}%", substring.to_lowercase());
                let mut stmt = conn.prepare(
                    "SELECT id FROM nodes WHERE LOWER(label) LIKE ?1 ORDER BY created_at LIMIT ?2",
                )?;
                let ids = stmt
                    .query_map(params![pattern, limit as i64], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ids)
            }
            Backend::Ephemeral { nodes, .. } => {
                let needle = substring.to_lowercase();
                let nodes = nodes.lock().expect("node map lock poisoned");
                let mut matches: Vec<(String, f64)> = nodes
                    .iter()
                    .filter(|(_, (blob, _))| blob.label.to_lowercase().contains(&needle))
                    .map(|(id, (blob, _))| (id.clone(), blob.created_at_secs))
                    .collect();
                matches.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
                Ok(matches.into_iter().take(limit).map(|(id, _)| id).collect())
            }
        }
    }
}

fn clone_blob(blob: &NodeBlob) -> NodeBlob {
    NodeBlob {
        label: blob.label.clone(),
        trinity: blob.trinity,
        position: blob.position,
        created_at_secs: blob.created_at_secs,
        payload: blob.payload.clone(),
    }
}

fn query_relations(conn: &Connection, column: &str, id: &str, kind: Option<&str>) -> Result<Vec<Relation>> {
    let sql = format!(
        "SELECT id, source_id, target_id, kind, weight, metadata FROM relations WHERE {column} = ?1 AND (?2 IS NULL OR kind = ?2)"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id, kind], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, source_id, target_id, kind, weight, metadata_json) = row?;
        let metadata: HashMap<String, JsonValue> = serde_json::from_str(&metadata_json).unwrap_or_default();
        out.push(Relation { id, source_id, target_id, kind, weight, metadata });
    }
    Ok(out)
}

/// Resolve `store_path` to an absolute, existing-directory path. Relative
/// paths (e.g. the default `"knowledge.db"`) are resolved under the
/// platform's project data directory.
fn resolve_path(store_path: &str) -> std::io::Result<PathBuf> {
    let path = Path::new(store_path);
    if path.is_absolute() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        return Ok(path.to_path_buf());
    }

    let proj_dirs = ProjectDirs::from("org", "noesis", "core")
        .ok_or_else(|| std::io::Error::other("could not determine project directories"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(data_dir, std::fs::Permissions::from_mode(0o700));
    }
    Ok(data_dir.join(path))
}
