//! Ontological node and relation records
//!
//! Plain data, owned by the service, mutated only through service
//! operations.

use crate::value::{FractalPosition, TrinityVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

/// Direction filter for relation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A typed, weighted, directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: String,
    pub weight: f64,
    pub metadata: HashMap<String, JsonValue>,
}

impl Relation {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: impl Into<String>,
        weight: f64,
        metadata: HashMap<String, JsonValue>,
    ) -> Self {
        Self {
            id: new_id(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind: kind.into(),
            weight: weight.clamp(0.0, 1.0),
            metadata,
        }
    }
}

/// The persistent record combining id, label, trinity, position, payload,
/// and outgoing relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologicalNode {
    id: String,
    label: String,
    trinity: TrinityVector,
    position: FractalPosition,
    created_at: DateTime<Utc>,
    payload: HashMap<String, JsonValue>,
    relations: Vec<Relation>,
}

impl OntologicalNode {
    /// Construct a node with a freshly-generated id and the current time as
    /// `created_at`.
    pub fn new(
        label: impl Into<String>,
        trinity: TrinityVector,
        position: FractalPosition,
        payload: HashMap<String, JsonValue>,
    ) -> Self {
        Self {
            id: new_id(),
            label: label.into(),
            trinity,
            position,
            created_at: Utc::now(),
            payload,
            relations: Vec::new(),
        }
    }

    /// Reconstruct a node with a known id and timestamp, e.g. when loading
    /// from the persistent store.
    pub fn from_parts(
        id: impl Into<String>,
        label: impl Into<String>,
        trinity: TrinityVector,
        position: FractalPosition,
        created_at: DateTime<Utc>,
        payload: HashMap<String, JsonValue>,
        relations: Vec<Relation>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            trinity,
            position,
            created_at,
            payload,
            relations,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn trinity(&self) -> &TrinityVector {
        &self.trinity
    }

    pub fn position(&self) -> &FractalPosition {
        &self.position
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &HashMap<String, JsonValue> {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut HashMap<String, JsonValue> {
        &mut self.payload
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relations_mut(&mut self) -> &mut Vec<Relation> {
        &mut self.relations
    }
}

/// Generate a fresh 32-character lowercase hexadecimal id.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_32_char_lowercase_hex() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn node_roundtrips_through_json() {
        let trinity = TrinityVector::new(0.8, 0.7, 0.9);
        let position = crate::fractal::position_of_default(&trinity);
        let node = OntologicalNode::new("query text", trinity, position, HashMap::new());
        let json = serde_json::to_string(&node).unwrap();
        let back: OntologicalNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }

    #[test]
    fn relation_weight_is_clamped() {
        let rel = Relation::new("a", "b", "entails", 3.0, HashMap::new());
        assert_eq!(rel.weight, 1.0);
    }
}
