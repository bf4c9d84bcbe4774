//! End-to-end write-back behaviour over the in-memory store.

use std::collections::HashMap;
use stratum_cache::Session;
use stratum_core::{
    new_entity, Entity, EntityData, LinkSpec, Partition, SessionConfig, SettingKind, TypeKey, Uri,
};
use stratum_store::{DefaultSettingRecord, MemoryStore, StoreGateway};

fn init_session(store: &MemoryStore) -> Session {
    let mut session = Session::new(SessionConfig::new("urn:stratum:model:it"));
    session.init(store).unwrap();
    session
}

fn asset(uri: &str) -> Entity {
    new_entity(EntityData::new(uri, "urn:type:Host"))
}

fn relation(uri: &str, source: &str, target: &str) -> Entity {
    new_entity(
        EntityData::new(uri, "urn:type:connectedTo")
            .with_link(LinkSpec::new(source, "urn:edge:connectedTo", target)),
    )
}

#[test]
fn test_store_then_delete_leaves_no_trace_and_authoritative_absence() {
    let store = MemoryStore::new();
    let mut session = init_session(&store);

    let a1 = asset("urn:a1");
    session.stage(&a1, TypeKey::Asset, Partition::Asserted).unwrap();
    session.delete(&a1, TypeKey::Asset).unwrap();
    session.sync(&store, &Partition::SYSTEM).unwrap();

    assert!(!store.contains_entity(&Uri::new("urn:a1"), &Partition::SYSTEM));
    // Absence stays authoritative: no store round trip on re-read.
    let reads = store.read_ops();
    let hit = session
        .fetch(&Uri::new("urn:a1"), TypeKey::Asset, &[Partition::Asserted], &store)
        .unwrap();
    assert!(hit.is_none());
    assert_eq!(store.read_ops(), reads);
}

#[test]
fn test_delete_then_store_persists_the_stored_attributes() {
    let store = MemoryStore::new();
    store.seed_entity(
        Partition::Asserted,
        TypeKey::Asset,
        EntityData::new("urn:a1", "urn:type:Host"),
    );
    let mut session = init_session(&store);

    let a1 = session
        .fetch(&Uri::new("urn:a1"), TypeKey::Asset, &[Partition::Asserted], &store)
        .unwrap()
        .unwrap();
    session.delete(&a1, TypeKey::Asset).unwrap();

    a1.write()
        .unwrap()
        .attributes
        .insert("label".into(), serde_json::json!("reborn"));
    session.stage(&a1, TypeKey::Asset, Partition::Asserted).unwrap();
    session.sync(&store, &[Partition::Asserted]).unwrap();

    let (_, data) = store
        .read_entity(&Uri::new("urn:a1"), &[Partition::Asserted])
        .unwrap()
        .unwrap();
    assert_eq!(data.attribute("label"), Some(&serde_json::json!("reborn")));
    assert!(!session.cache().is_pending_delete(&Uri::new("urn:a1"), TypeKey::Asset));
}

#[test]
fn test_relationship_indexed_before_sync_stored_after() {
    let store = MemoryStore::new();
    let mut session = init_session(&store);

    session.stage(&asset("urn:a1"), TypeKey::Asset, Partition::Asserted).unwrap();
    session.stage(&asset("urn:a2"), TypeKey::Asset, Partition::Asserted).unwrap();
    let r1 = relation("urn:r1", "urn:a1", "urn:a2");
    session.stage(&r1, TypeKey::Relation, Partition::Asserted).unwrap();

    // Before sync the index already knows the edge.
    assert_eq!(
        session.relationships().outgoing_of(&Uri::new("urn:a1")),
        &[Uri::new("urn:r1")]
    );

    session.sync(&store, &[Partition::Asserted]).unwrap();
    assert!(store.contains_entity(&Uri::new("urn:r1"), &[Partition::Asserted]));
    assert_eq!(store.link_count(Partition::Asserted), 1);

    // Staging the same relationship again must not duplicate the edge fact.
    session.stage(&r1, TypeKey::Relation, Partition::Asserted).unwrap();
    session.sync(&store, &[Partition::Asserted]).unwrap();
    assert_eq!(store.link_count(Partition::Asserted), 1);
}

#[test]
fn test_sync_failure_reaches_the_caller_with_partial_state() {
    let store = MemoryStore::new();
    let mut session = init_session(&store);

    session.stage(&asset("urn:a1"), TypeKey::Asset, Partition::Asserted).unwrap();
    session.stage(&asset("urn:u1"), TypeKey::Asset, Partition::Ui).unwrap();
    store.fail_next_commit_on(Partition::Ui);

    let err = session
        .sync(&store, &[Partition::Asserted, Partition::Ui])
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("ui"));

    // Asserted committed before the failure; Ui staging survives for retry.
    assert!(store.contains_entity(&Uri::new("urn:a1"), &[Partition::Asserted]));
    assert!(!store.contains_entity(&Uri::new("urn:u1"), &[Partition::Ui]));
    let report = session.sync(&store, &[Partition::Asserted, Partition::Ui]).unwrap();
    assert_eq!(report.stored, vec![(Partition::Ui, 1)]);
    assert!(store.contains_entity(&Uri::new("urn:u1"), &[Partition::Ui]));
}

#[test]
fn test_mutating_a_fetched_handle_is_persisted_by_a_later_stage() {
    let store = MemoryStore::new();
    store.seed_entity(
        Partition::Asserted,
        TypeKey::Asset,
        EntityData::new("urn:a1", "urn:type:Host"),
    );
    let mut session = init_session(&store);

    let a1 = session
        .fetch(&Uri::new("urn:a1"), TypeKey::Asset, &[Partition::Asserted], &store)
        .unwrap()
        .unwrap();
    a1.write()
        .unwrap()
        .attributes
        .insert("population".into(), serde_json::json!(7));
    session.stage(&a1, TypeKey::Asset, Partition::Asserted).unwrap();
    session.sync(&store, &[Partition::Asserted]).unwrap();

    let (_, data) = store
        .read_entity(&Uri::new("urn:a1"), &[Partition::Asserted])
        .unwrap()
        .unwrap();
    assert_eq!(data.attribute("population"), Some(&serde_json::json!(7)));
}

#[test]
fn test_delete_all_then_sync_clears_the_population() {
    let store = MemoryStore::new();
    for i in 0..3 {
        store.seed_entity(
            Partition::Asserted,
            TypeKey::Asset,
            EntityData::new(format!("urn:a{i}"), "urn:type:Host"),
        );
    }
    let mut session = init_session(&store);
    let all = session
        .fetch_all(TypeKey::Asset, &[Partition::Asserted], &store)
        .unwrap();
    let map: HashMap<Uri, Entity> = all
        .into_iter()
        .map(|e| {
            let uri = e.read().unwrap().uri.clone();
            (uri, e)
        })
        .collect();

    session.delete_all(&map, TypeKey::Asset).unwrap();
    session.sync(&store, &[Partition::Asserted]).unwrap();
    assert_eq!(store.entity_count(Partition::Asserted), 0);
}

#[test]
fn test_canonicalization_repair_round_trips_through_sync() {
    let store = MemoryStore::new();
    let link = LinkSpec::new("urn:a1", "urn:edge:connectedTo", "urn:a2");
    store.seed_entity(
        Partition::Asserted,
        TypeKey::Relation,
        EntityData::new("urn:legacy-rel", "urn:type:connectedTo").with_link(link.clone()),
    );
    store.seed_link(Partition::Asserted, link);
    let mut session = init_session(&store);

    session
        .fetch_all(TypeKey::Relation, &[Partition::Asserted], &store)
        .unwrap();
    let replaced = session.canonicalize_relationships(Partition::Asserted).unwrap();
    assert_eq!(replaced.len(), 1);
    let (old, new) = replaced[0].clone();

    session.sync(&store, &[Partition::Asserted]).unwrap();
    assert!(!store.contains_entity(&old, &Partition::SYSTEM));
    assert!(store.contains_entity(&new, &[Partition::Asserted]));
    // The edge fact survives under the replacement relationship.
    assert_eq!(store.link_count(Partition::Asserted), 1);
}

#[test]
fn test_default_settings_resolve_after_init_from_schema() {
    let store = MemoryStore::new();
    store.seed_subtype(Partition::Meta, "t:WebServer", "t:Server");
    store.seed_subtype(Partition::Meta, "t:Server", "t:Asset");
    store.seed_default_setting(
        Partition::Meta,
        DefaultSettingRecord {
            type_uri: Uri::new("t:Asset"),
            kind: SettingKind::TrustAttribute,
            setting: Uri::new("s:asset-ta"),
        },
    );
    let mut session = init_session(&store);

    assert_eq!(
        session.default_setting(&Uri::new("t:WebServer"), SettingKind::TrustAttribute),
        Some(&Uri::new("s:asset-ta"))
    );
}
