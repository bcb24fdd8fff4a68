use super::{OwnerId, RegisterOutcome, Registry, RemoveOutcome, SharedRegistry};
use crate::plate::Plate;
use std::path::{Path, PathBuf};

const ALICE: OwnerId = OwnerId(111);
const BOB: OwnerId = OwnerId(222);

fn registry_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("registered_plates.json")
}

fn plate(raw: &str) -> Plate {
    Plate::parse(raw).expect("valid test plate")
}

fn file_text(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read registry file")
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let registry = Registry::load(&registry_path(&dir), 4).expect("load");
    assert!(registry.entries().is_empty());
}

#[test]
fn corrupt_file_fails_to_load() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    std::fs::write(&path, "{ not json").expect("write");
    let err = Registry::load(&path, 4).expect_err("corrupt file must fail");
    assert!(format!("{err:#}").contains("parse registry JSON"));
}

#[test]
fn unnormalized_key_fails_to_load() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    std::fs::write(&path, r#"{"30a-12345": 111}"#).expect("write");
    assert!(Registry::load(&path, 4).is_err());
}

#[test]
fn non_integer_owner_fails_to_load() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    std::fs::write(&path, r#"{"30A12345": "alice"}"#).expect("write");
    let err = Registry::load(&path, 4).expect_err("string owner must fail");
    assert!(err.to_string().contains("non-negative integer"));
}

#[test]
fn register_normalizes_and_persists_before_returning() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let mut registry = Registry::load(&path, 4).expect("load");

    let outcome = registry.register(" 30a-123.45 ", ALICE).expect("register");
    assert_eq!(outcome, RegisterOutcome::Registered(plate("30A12345")));
    assert_eq!(file_text(&path), "{\n    \"30A12345\": 111\n}");
}

#[test]
fn invalid_plate_is_rejected_without_touching_the_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let mut registry = Registry::load(&path, 4).expect("load");

    let outcome = registry.register("not a plate", ALICE).expect("register");
    assert!(matches!(outcome, RegisterOutcome::InvalidFormat(_)));
    let outcome = registry.remove("???", ALICE).expect("remove");
    assert!(matches!(outcome, RemoveOutcome::InvalidFormat(_)));
    assert!(!path.exists(), "rejected input must not create the file");
    assert!(registry.entries().is_empty());
}

#[test]
fn fifth_plate_hits_the_limit_and_leaves_store_unchanged() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let mut registry = Registry::load(&path, 4).expect("load");
    for raw in ["30A11111", "30A22222", "30A33333", "30A44444"] {
        let outcome = registry.register(raw, ALICE).expect("register");
        assert!(matches!(outcome, RegisterOutcome::Registered(_)));
    }
    let before = file_text(&path);

    let outcome = registry.register("30A55555", ALICE).expect("register");
    assert_eq!(outcome, RegisterOutcome::LimitReached { max: 4 });
    assert_eq!(registry.list(ALICE).len(), 4);
    assert_eq!(file_text(&path), before);

    let outcome = registry.register("30A55555", BOB).expect("other owner");
    assert!(matches!(outcome, RegisterOutcome::Registered(_)));
}

#[test]
fn reregistering_own_plate_does_not_consume_capacity() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut registry = Registry::load(&registry_path(&dir), 1).expect("load");
    registry.register("30A11111", ALICE).expect("register");

    let outcome = registry.register("30a 11111", ALICE).expect("register again");
    assert_eq!(outcome, RegisterOutcome::AlreadyRegistered(plate("30A11111")));
    assert_eq!(registry.entries().len(), 1);
}

#[test]
fn plate_owned_by_someone_else_cannot_be_taken() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let mut registry = Registry::load(&path, 4).expect("load");
    registry.register("30A11111", ALICE).expect("register");
    let before = file_text(&path);

    let outcome = registry.register("30A11111", BOB).expect("register");
    assert_eq!(outcome, RegisterOutcome::OwnedByOther(plate("30A11111")));
    assert_eq!(registry.list(ALICE), vec![plate("30A11111")]);
    assert!(registry.list(BOB).is_empty());
    assert_eq!(file_text(&path), before);
}

#[test]
fn list_returns_only_the_owners_plates_in_insertion_order() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut registry = Registry::load(&registry_path(&dir), 4).expect("load");
    registry.register("51F99999", ALICE).expect("p1");
    registry.register("30A11111", BOB).expect("p3");
    registry.register("29LD012345", ALICE).expect("p2");

    assert_eq!(
        registry.list(ALICE),
        vec![plate("51F99999"), plate("29LD012345")]
    );
    assert_eq!(registry.list(BOB), vec![plate("30A11111")]);
}

#[test]
fn remove_requires_ownership() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let mut registry = Registry::load(&path, 4).expect("load");
    registry.register("30A11111", ALICE).expect("register");
    let before = file_text(&path);

    let outcome = registry.remove("30A11111", BOB).expect("remove");
    assert_eq!(outcome, RemoveOutcome::NotFoundOrNotOwner);
    let outcome = registry.remove("99Z99999", ALICE).expect("remove");
    assert_eq!(outcome, RemoveOutcome::NotFoundOrNotOwner);
    assert_eq!(file_text(&path), before);

    let outcome = registry.remove("30a-111.11", ALICE).expect("remove");
    assert_eq!(outcome, RemoveOutcome::Removed(plate("30A11111")));
    assert!(registry.list(ALICE).is_empty());
    assert_eq!(file_text(&path), "{}");
}

#[test]
fn save_then_load_round_trips_order_and_owners() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let mut registry = Registry::load(&path, 4).expect("load");
    registry.register("51F99999", BOB).expect("register");
    registry.register("30A11111", ALICE).expect("register");
    registry.register("29LD012345", OwnerId(u64::MAX)).expect("register");

    let reloaded = Registry::load(&path, 4).expect("reload");
    assert_eq!(reloaded.entries(), registry.entries());
}

#[test]
fn shared_registry_reload_sees_external_writes() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let shared = SharedRegistry::new(Registry::load(&path, 4).expect("load"));
    assert!(shared.snapshot().is_empty());

    let mut other = Registry::load(&path, 4).expect("load second handle");
    other.register("30A11111", ALICE).expect("register");

    shared.reload().expect("reload");
    let snapshot = shared.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].owner, ALICE);
}

#[test]
fn shared_registry_serializes_concurrent_registrations() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = registry_path(&dir);
    let shared = SharedRegistry::new(Registry::load(&path, 4).expect("load"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                shared
                    .register(&format!("30A1111{i}"), ALICE)
                    .expect("register")
            })
        })
        .collect();
    let registered = handles
        .into_iter()
        .map(|handle| handle.join().expect("join"))
        .filter(|outcome| matches!(outcome, RegisterOutcome::Registered(_)))
        .count();

    assert_eq!(registered, 4);
    assert_eq!(shared.list(ALICE).len(), 4);
    let reloaded = Registry::load(&path, 4).expect("reload");
    assert_eq!(reloaded.entries().len(), 4);
}
