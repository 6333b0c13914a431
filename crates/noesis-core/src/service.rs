//! Knowledge service - the public façade
//!
//! Wires together the value types, the escape-time positioner, the modal
//! classifier, the two spatial indices, the node cache, and the persistent
//! store. Every public operation validates an opaque capability token and
//! the open/closed state machine before doing any work.

use crate::cache::NodeCache;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fractal;
use crate::index::{PositionIndex, TrinityIndex};
use crate::modal;
use crate::node::{Direction, OntologicalNode, Relation};
use crate::storage::Store;
use crate::value::{FractalPosition, TrinityVector};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// An opaque authorization credential. The core validates only presence
/// and non-expiry; issuance and renewal are out of scope.
#[derive(Debug, Clone)]
pub struct Capability {
    issued_at: DateTime<Utc>,
    ttl: ChronoDuration,
}

impl Capability {
    /// Issue a capability valid for `ttl` starting now.
    pub fn issue(ttl: ChronoDuration) -> Self {
        Self { issued_at: Utc::now(), ttl }
    }

    fn is_valid(&self) -> bool {
        Utc::now() < self.issued_at + self.ttl
    }
}

/// How `create_node` should obtain the new node's fractal position.
pub enum PositionInput {
    /// Derive the position from `trinity` via the escape-time positioner.
    Derive,
    /// Use this position as-is (e.g. a perturbed position built by
    /// `decompose`).
    Explicit(FractalPosition),
}

/// Candidates oversampled per requested `k` to absorb duplicate ids
/// produced by the insertion-only k-d tree before deduplicating.
const DEDUP_OVERSAMPLE: usize = 4;

/// The public façade over the knowledge engine.
pub struct KnowledgeService {
    config: EngineConfig,
    store: Store,
    cache: NodeCache,
    trinity_index: Mutex<TrinityIndex>,
    position_index: Mutex<PositionIndex>,
    closed: AtomicBool,
}

impl KnowledgeService {
    /// Open the service against `config`, rebuilding both spatial indices
    /// eagerly by scanning the persistent store.
    pub fn open(config: EngineConfig) -> Self {
        let store = Store::open(&config.store_path, config.persistence_enabled);
        if store.is_ephemeral() && config.persistence_enabled {
            tracing::warn!("persistent store unavailable, degraded to ephemeral mode");
        }

        let service = Self {
            cache: NodeCache::new(config.cache_size),
            trinity_index: Mutex::new(TrinityIndex::new()),
            position_index: Mutex::new(PositionIndex::new()),
            store,
            config,
            closed: AtomicBool::new(false),
        };
        service.rebuild_indices();
        service
    }

    /// Rebuild both spatial indices from the persistent store, discarding
    /// whatever they currently hold. Exposed so callers can force a rebuild
    /// if they suspect the in-memory index has grown unbalanced; never
    /// required for correctness.
    pub fn rebuild_indices(&self) {
        let nodes = match self.store.all_nodes() {
            Ok(nodes) => nodes,
            Err(err) => {
                tracing::warn!("failed to scan store while rebuilding indices: {err}");
                return;
            }
        };

        let mut trinity_index = TrinityIndex::new();
        let mut position_index = PositionIndex::new();
        for node in &nodes {
            trinity_index.insert(node.id(), node.trinity().as_point());
            position_index.insert(node.id(), node.position().as_point());
        }

        *self.trinity_index.lock().expect("trinity index lock poisoned") = trinity_index;
        *self.position_index.lock().expect("position index lock poisoned") = position_index;
    }

    fn check_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::ServiceClosed);
        }
        Ok(())
    }

    fn check_capability(&self, cap: &Capability) -> Result<(), EngineError> {
        if !cap.is_valid() {
            return Err(EngineError::Unauthorized);
        }
        Ok(())
    }

    fn guard(&self, cap: &Capability) -> Result<(), EngineError> {
        self.check_open()?;
        self.check_capability(cap)
    }

    /// Transition to closed. All subsequent operations fail with
    /// `ServiceClosed`. Idempotent.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn get_node_internal(&self, id: &str) -> Result<Option<OntologicalNode>, EngineError> {
        if let Some(node) = self.cache.get(id) {
            return Ok(Some(node));
        }
        match self.store.get_node(id)? {
            Some(node) => {
                self.cache.put(node.clone());
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Create a node, positioning it, classifying its modal status into its
    /// payload, persisting, caching, and indexing it. If `parent_id` is
    /// given and resolves, links the new node to it with a `derived_from`
    /// relation; if it doesn't resolve, the node is still created anyway.
    #[allow(clippy::too_many_arguments)]
    pub fn create_node(
        &self,
        cap: &Capability,
        label: impl Into<String>,
        trinity: TrinityVector,
        position_input: PositionInput,
        parent_id: Option<&str>,
        payload: Option<HashMap<String, JsonValue>>,
    ) -> Result<OntologicalNode, EngineError> {
        self.guard(cap)?;

        let position = match position_input {
            PositionInput::Derive => fractal::position_of(&trinity, self.config.max_iter, self.config.escape_radius),
            PositionInput::Explicit(position) => position,
        };
        let (status, coherence) = modal::classify(&trinity);

        let mut payload = payload.unwrap_or_default();
        payload.insert("modal_status".to_string(), json!(status.to_string()));
        payload.insert("coherence".to_string(), json!(coherence));

        let mut node = OntologicalNode::new(label, trinity, position, payload);
        self.store.put_node(&node)?;
        self.cache.put(node.clone());
        self.trinity_index.lock().expect("trinity index lock poisoned").insert(node.id(), trinity.as_point());
        self.position_index.lock().expect("position index lock poisoned").insert(node.id(), position.as_point());

        if let Some(parent_id) = parent_id {
            match self.get_node_internal(parent_id)? {
                Some(_) => {
                    let rel = Relation::new(node.id(), parent_id, "derived_from", 1.0, HashMap::new());
                    self.store.put_relation(&rel)?;
                    node.relations_mut().push(rel);
                    self.cache.put(node.clone());
                }
                None => {
                    tracing::warn!("parent node {parent_id} not found; creating {} without a derived_from relation", node.id());
                }
            }
        }

        Ok(node)
    }

    /// Fetch a node, cache then store.
    pub fn get_node(&self, cap: &Capability, id: &str) -> Result<Option<OntologicalNode>, EngineError> {
        self.guard(cap)?;
        self.get_node_internal(id)
    }

    /// Destroy a node, cascading its relations. The stale id left behind in
    /// the spatial indices is harmless: `resolve_nearest` drops any
    /// candidate whose `get_node_internal` comes back empty.
    pub fn remove(&self, cap: &Capability, id: &str) -> Result<(), EngineError> {
        self.guard(cap)?;
        self.store.delete_node(id)?;
        self.cache.invalidate(id);
        Ok(())
    }

    /// Add (or upsert, by source/kind/target) a relation between two
    /// existing nodes. Metadata merges with any existing row, caller's
    /// fields winning on conflict.
    pub fn add_relation(
        &self,
        cap: &Capability,
        source_id: &str,
        target_id: &str,
        kind: impl Into<String>,
        weight: f64,
        metadata: Option<HashMap<String, JsonValue>>,
    ) -> Result<(), EngineError> {
        self.guard(cap)?;
        let kind = kind.into();

        if self.get_node_internal(source_id)?.is_none() {
            return Err(EngineError::MissingEndpoint(source_id.to_string()));
        }
        if self.get_node_internal(target_id)?.is_none() {
            return Err(EngineError::MissingEndpoint(target_id.to_string()));
        }

        let existing = self
            .store
            .list_relations(source_id, Some(&kind), Direction::Outgoing)?
            .into_iter()
            .find(|r| r.target_id == target_id);

        let mut metadata = metadata.unwrap_or_default();
        if let Some(existing) = &existing {
            for (k, v) in &existing.metadata {
                metadata.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        let rel = match existing {
            Some(existing) => Relation {
                id: existing.id,
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
                kind,
                weight: weight.clamp(0.0, 1.0),
                metadata,
            },
            None => Relation::new(source_id, target_id, kind, weight, metadata),
        };

        self.store.put_relation(&rel)?;

        if let Some(mut node) = self.cache.get(source_id) {
            node.relations_mut().retain(|r| !(r.target_id == target_id && r.kind == rel.kind));
            node.relations_mut().push(rel);
            self.cache.put(node);
        }

        Ok(())
    }

    /// Relations touching `id`, deduplicated by (source, target, kind).
    pub fn relations_of(
        &self,
        cap: &Capability,
        id: &str,
        kind: Option<&str>,
        direction: Direction,
    ) -> Result<Vec<Relation>, EngineError> {
        self.guard(cap)?;

        let mut combined = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            if let Some(node) = self.cache.get(id) {
                combined.extend(node.relations().iter().filter(|r| kind.is_none_or(|k| r.kind == k)).cloned());
            }
        }
        combined.extend(self.store.list_relations(id, kind, direction)?);

        let mut seen = HashSet::new();
        combined.retain(|r| seen.insert((r.source_id.clone(), r.target_id.clone(), r.kind.clone())));
        Ok(combined)
    }

    /// The `k` nodes nearest `trinity` by trinity-vector distance, sorted
    /// ascending, deduplicated by id.
    pub fn nearest_by_trinity(
        &self,
        cap: &Capability,
        trinity: &TrinityVector,
        k: usize,
    ) -> Result<Vec<(OntologicalNode, f64)>, EngineError> {
        self.guard(cap)?;
        let candidates = {
            let index = self.trinity_index.lock().expect("trinity index lock poisoned");
            index.k_nearest(&trinity.as_point(), k.saturating_mul(DEDUP_OVERSAMPLE).max(k))
        };
        self.resolve_nearest(candidates, k)
    }

    /// The `k` nodes nearest `position` by complex-plane distance, sorted
    /// ascending, deduplicated by id.
    pub fn nearest_by_position(
        &self,
        cap: &Capability,
        position: &FractalPosition,
        k: usize,
    ) -> Result<Vec<(OntologicalNode, f64)>, EngineError> {
        self.guard(cap)?;
        let candidates = {
            let index = self.position_index.lock().expect("position index lock poisoned");
            index.k_nearest(&position.as_point(), k.saturating_mul(DEDUP_OVERSAMPLE).max(k))
        };
        self.resolve_nearest(candidates, k)
    }

    fn resolve_nearest(
        &self,
        candidates: Vec<(String, f64)>,
        k: usize,
    ) -> Result<Vec<(OntologicalNode, f64)>, EngineError> {
        let mut best_by_id: HashMap<String, f64> = HashMap::new();
        for (id, dist) in candidates {
            best_by_id.entry(id).and_modify(|best| *best = best.min(dist)).or_insert(dist);
        }
        let mut ranked: Vec<(String, f64)> = best_by_id.into_iter().collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);

        let mut out = Vec::with_capacity(ranked.len());
        for (id, dist) in ranked {
            if let Some(node) = self.get_node_internal(&id)? {
                out.push((node, dist));
            }
        }
        Ok(out)
    }

    /// Cache-first substring label match, then persistent store for the
    /// remainder up to `limit`.
    pub fn find_by_label(&self, cap: &Capability, substring: &str, limit: usize) -> Result<Vec<OntologicalNode>, EngineError> {
        self.guard(cap)?;

        let mut matches = self.cache.find_by_label(substring, limit);
        let mut seen: HashSet<String> = matches.iter().map(|n| n.id().to_string()).collect();

        if matches.len() < limit {
            for id in self.store.find_by_label(substring, limit)? {
                if seen.contains(&id) {
                    continue;
                }
                if let Some(node) = self.get_node_internal(&id)? {
                    seen.insert(node.id().to_string());
                    matches.push(node);
                }
                if matches.len() >= limit {
                    break;
                }
            }
        }

        Ok(matches)
    }

    /// Type-check and evaluate an expression against the empty environment,
    /// for callers that want to canonicalize a query's associated
    /// expression before attaching it to a node's payload. Not invoked
    /// implicitly by `create_node`: the caller decides whether a given
    /// query has an associated expression worth canonicalizing.
    pub fn canonicalize(&self, cap: &Capability, expr: &crate::expr::Expr, fuel: u32) -> Result<crate::expr::Expr, EngineError> {
        self.guard(cap)?;
        crate::expr::type_check(expr, &crate::expr::TypeEnv::new())?;
        Ok(crate::expr::evaluate(expr, fuel)?)
    }

    /// The perturb-and-link operator. `pieces = 0` is a no-op returning an
    /// empty sequence.
    pub fn decompose(&self, cap: &Capability, id: &str, pieces: usize, perturbation: f64) -> Result<Vec<String>, EngineError> {
        self.guard(cap)?;
        let source = self.get_node_internal(id)?.ok_or_else(|| EngineError::UnknownNode(id.to_string()))?;

        let mut new_ids = Vec::with_capacity(pieces);
        let mut rng = rand::thread_rng();

        for i in 0..pieces {
            let perturbed_trinity = TrinityVector::new(
                source.trinity().existence() + rng.gen_range(-perturbation..=perturbation),
                source.trinity().goodness() + rng.gen_range(-perturbation..=perturbation),
                source.trinity().truth() + rng.gen_range(-perturbation..=perturbation),
            );
            let perturbed_c_real = source.position().c_real() + rng.gen_range(-perturbation..=perturbation);
            let perturbed_c_imag = source.position().c_imag() + rng.gen_range(-perturbation..=perturbation);
            let position = fractal::position_from_complex(
                perturbed_c_real,
                perturbed_c_imag,
                self.config.max_iter,
                self.config.escape_radius,
            );

            let mut payload = source.payload().clone();
            payload.insert("original_node_id".to_string(), json!(source.id()));
            payload.insert("piece_index".to_string(), json!(i + 1));

            let kind = "decomposition";
            let label = format!("{kind} Piece {} of '{}'", i + 1, source.label());
            let piece = self.create_node(cap, label, perturbed_trinity, PositionInput::Explicit(position), None, Some(payload))?;

            self.add_relation(cap, source.id(), piece.id(), kind, 1.0 / pieces as f64, None)?;
            self.add_relation(cap, piece.id(), source.id(), "derived_from", 1.0, None)?;

            new_ids.push(piece.id().to_string());
        }

        Ok(new_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> KnowledgeService {
        KnowledgeService::open(EngineConfig { persistence_enabled: false, ..EngineConfig::default() })
    }

    fn cap() -> Capability {
        Capability::issue(ChronoDuration::minutes(5))
    }

    #[test]
    fn expired_capability_is_rejected() {
        let service = service();
        let expired = Capability { issued_at: Utc::now() - ChronoDuration::hours(1), ttl: ChronoDuration::minutes(1) };
        let err = service.get_node(&expired, "anything").unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized));
    }

    #[test]
    fn closed_service_rejects_all_operations() {
        let service = service();
        service.shutdown();
        let err = service.get_node(&cap(), "anything").unwrap_err();
        assert!(matches!(err, EngineError::ServiceClosed));
    }

    #[test]
    fn scenario_create_node_a_matches_literal_position_and_status() {
        let service = service();
        let trinity = TrinityVector::new(0.8, 0.7, 0.9);
        let node = service.create_node(&cap(), "query A", trinity, PositionInput::Derive, None, None).unwrap();
        assert!((node.position().c_real() - 0.72).abs() < 1e-12);
        assert!((node.position().c_imag() - 0.7).abs() < 1e-12);
        assert_eq!(node.payload().get("modal_status").unwrap(), "Actual");
    }

    #[test]
    fn scenario_nearest_by_trinity_orders_a_before_b() {
        let service = service();
        let a = service
            .create_node(&cap(), "A", TrinityVector::new(0.8, 0.7, 0.9), PositionInput::Derive, None, None)
            .unwrap();
        service
            .create_node(&cap(), "B", TrinityVector::new(0.81, 0.71, 0.91), PositionInput::Derive, None, None)
            .unwrap();

        let nearest = service.nearest_by_trinity(&cap(), &TrinityVector::new(0.8, 0.7, 0.9), 2).unwrap();
        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest[0].0.id(), a.id());
        assert!(nearest[0].1 < 1e-12);
        assert!((nearest[1].1 - 0.0173).abs() < 1e-3);
    }

    #[test]
    fn scenario_necessary_classification() {
        let service = service();
        let node = service
            .create_node(&cap(), "A", TrinityVector::new(0.95, 0.95, 0.95), PositionInput::Derive, None, None)
            .unwrap();
        assert_eq!(node.payload().get("modal_status").unwrap(), "Necessary");
    }

    #[test]
    fn scenario_relation_visible_both_directions() {
        let service = service();
        let a = service.create_node(&cap(), "A", TrinityVector::new(0.5, 0.5, 0.5), PositionInput::Derive, None, None).unwrap();
        let b = service.create_node(&cap(), "B", TrinityVector::new(0.4, 0.4, 0.4), PositionInput::Derive, None, None).unwrap();

        service.add_relation(&cap(), a.id(), b.id(), "entails", 0.7, None).unwrap();

        let outgoing = service.relations_of(&cap(), a.id(), Some("entails"), Direction::Outgoing).unwrap();
        assert_eq!(outgoing.len(), 1);
        let incoming = service.relations_of(&cap(), b.id(), None, Direction::Incoming).unwrap();
        assert_eq!(incoming.len(), 1);
    }

    #[test]
    fn scenario_delete_cascades_incoming_relations() {
        let service = service();
        let a = service.create_node(&cap(), "A", TrinityVector::new(0.5, 0.5, 0.5), PositionInput::Derive, None, None).unwrap();
        let b = service.create_node(&cap(), "B", TrinityVector::new(0.4, 0.4, 0.4), PositionInput::Derive, None, None).unwrap();
        service.add_relation(&cap(), a.id(), b.id(), "entails", 0.7, None).unwrap();

        service.remove(&cap(), a.id()).unwrap();

        assert!(service.get_node(&cap(), b.id()).unwrap().is_some());
        let incoming = service.relations_of(&cap(), b.id(), None, Direction::Incoming).unwrap();
        assert!(incoming.is_empty());
    }

    #[test]
    fn scenario_decompose_into_three_pieces() {
        let service = service();
        let a = service.create_node(&cap(), "A", TrinityVector::new(0.8, 0.7, 0.9), PositionInput::Derive, None, None).unwrap();

        let pieces = service.decompose(&cap(), a.id(), 3, 0.01).unwrap();
        assert_eq!(pieces.len(), 3);

        for piece_id in &pieces {
            let piece = service.get_node(&cap(), piece_id).unwrap().unwrap();
            assert!((piece.trinity().existence() - a.trinity().existence()).abs() <= 0.01);
            assert!((piece.trinity().goodness() - a.trinity().goodness()).abs() <= 0.01);
            assert!((piece.trinity().truth() - a.trinity().truth()).abs() <= 0.01);
        }

        let decompositions = service.relations_of(&cap(), a.id(), Some("decomposition"), Direction::Outgoing).unwrap();
        assert_eq!(decompositions.len(), 3);
        for rel in decompositions {
            assert!((rel.weight - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn decompose_with_zero_pieces_creates_nothing() {
        let service = service();
        let a = service.create_node(&cap(), "A", TrinityVector::new(0.5, 0.5, 0.5), PositionInput::Derive, None, None).unwrap();
        let pieces = service.decompose(&cap(), a.id(), 0, 0.01).unwrap();
        assert!(pieces.is_empty());
        assert!(service.relations_of(&cap(), a.id(), None, Direction::Outgoing).unwrap().is_empty());
    }

    #[test]
    fn canonicalize_evaluates_a_well_typed_expression() {
        let service = service();
        let expr = crate::expr::Expr::app(crate::expr::truth_operator("NOT"), crate::expr::true_prop());
        let result = service.canonicalize(&cap(), &expr, 5).unwrap();
        assert_eq!(result, crate::expr::false_prop());
    }

    #[test]
    fn create_node_with_unresolvable_parent_still_succeeds() {
        let service = service();
        let node = service
            .create_node(&cap(), "orphan", TrinityVector::new(0.5, 0.5, 0.5), PositionInput::Derive, Some("missing"), None)
            .unwrap();
        assert!(node.relations().is_empty());
    }
}
