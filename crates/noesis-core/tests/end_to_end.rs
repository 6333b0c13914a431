//! End-to-end scenarios against the public `KnowledgeService` façade.

use chrono::Duration;
use noesis_core::{Capability, Direction, EngineConfig, KnowledgeService, PositionInput, TrinityVector};

fn service() -> KnowledgeService {
    KnowledgeService::open(EngineConfig { persistence_enabled: false, ..EngineConfig::default() })
}

fn cap() -> Capability {
    Capability::issue(Duration::minutes(5))
}

#[test]
fn creating_a_node_positions_and_classifies_it() {
    let service = service();
    let trinity = TrinityVector::new(0.8, 0.7, 0.9);

    let node = service.create_node(&cap(), "is mercy good?", trinity, PositionInput::Derive, None, None).unwrap();

    assert!((node.position().c_real() - 0.72).abs() < 1e-12);
    assert!((node.position().c_imag() - 0.7).abs() < 1e-12);
    assert_eq!(node.payload().get("modal_status").unwrap(), "Actual");
}

#[test]
fn necessary_trinity_is_classified_necessary() {
    let service = service();
    let node = service
        .create_node(&cap(), "the first cause", TrinityVector::new(0.95, 0.95, 0.95), PositionInput::Derive, None, None)
        .unwrap();
    assert_eq!(node.payload().get("modal_status").unwrap(), "Necessary");
}

#[test]
fn nearest_by_trinity_ranks_the_closer_node_first() {
    let service = service();
    let a = service.create_node(&cap(), "A", TrinityVector::new(0.8, 0.7, 0.9), PositionInput::Derive, None, None).unwrap();
    service
        .create_node(&cap(), "B", TrinityVector::new(0.81, 0.71, 0.91), PositionInput::Derive, None, None)
        .unwrap();

    let nearest = service.nearest_by_trinity(&cap(), &TrinityVector::new(0.8, 0.7, 0.9), 2).unwrap();

    assert_eq!(nearest.len(), 2);
    assert_eq!(nearest[0].0.id(), a.id());
}

#[test]
fn relations_are_visible_from_both_endpoints() {
    let service = service();
    let a = service.create_node(&cap(), "A", TrinityVector::new(0.5, 0.5, 0.5), PositionInput::Derive, None, None).unwrap();
    let b = service.create_node(&cap(), "B", TrinityVector::new(0.4, 0.4, 0.4), PositionInput::Derive, None, None).unwrap();

    service.add_relation(&cap(), a.id(), b.id(), "entails", 0.7, None).unwrap();

    assert_eq!(service.relations_of(&cap(), a.id(), Some("entails"), Direction::Outgoing).unwrap().len(), 1);
    assert_eq!(service.relations_of(&cap(), b.id(), None, Direction::Incoming).unwrap().len(), 1);
}

#[test]
fn removing_a_node_cascades_its_relations() {
    let service = service();
    let a = service.create_node(&cap(), "A", TrinityVector::new(0.5, 0.5, 0.5), PositionInput::Derive, None, None).unwrap();
    let b = service.create_node(&cap(), "B", TrinityVector::new(0.4, 0.4, 0.4), PositionInput::Derive, None, None).unwrap();
    service.add_relation(&cap(), a.id(), b.id(), "entails", 0.7, None).unwrap();

    service.remove(&cap(), a.id()).unwrap();

    assert!(service.get_node(&cap(), b.id()).unwrap().is_some());
    assert!(service.relations_of(&cap(), b.id(), None, Direction::Incoming).unwrap().is_empty());
}

#[test]
fn decomposing_a_node_links_every_piece_back_to_it() {
    let service = service();
    let source = service.create_node(&cap(), "A", TrinityVector::new(0.8, 0.7, 0.9), PositionInput::Derive, None, None).unwrap();

    let pieces = service.decompose(&cap(), source.id(), 3, 0.01).unwrap();

    assert_eq!(pieces.len(), 3);
    let outgoing = service.relations_of(&cap(), source.id(), Some("decomposition"), Direction::Outgoing).unwrap();
    assert_eq!(outgoing.len(), 3);
}

#[test]
fn an_expired_capability_is_rejected_everywhere() {
    let service = service();
    let expired = Capability::issue(Duration::seconds(-1));
    assert!(service.get_node(&expired, "anything").is_err());
}
