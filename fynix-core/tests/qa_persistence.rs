//! Persistence across the file backend: snapshots survive restarts,
//! corrupt blobs never block startup, and old schemas are backfilled.

use fynix_core::persist::{
    load_state, profile_key, save_state, FileBackend, StorageBackend, STATE_KEY,
};
use fynix_core::state::AppState;
use fynix_core::store::Store;
use fynix_core::testing::memory_store;

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let backend = FileBackend::new(dir.path()).unwrap();
        let mut store = Store::new(Box::new(backend));
        store.login_as_guest();
        store.seed_feed();
        store
            .add_vocab_list("Unit 1", "Deutsch", "Englisch")
            .unwrap();
        store.set_screen("vocab");
    }

    let backend = FileBackend::new(dir.path()).unwrap();
    let store = Store::new(Box::new(backend));
    assert_eq!(store.state().screen, "vocab");
    assert_eq!(store.state().vocab_lists.len(), 1);
    assert!(!store.state().feed.is_empty());
    assert!(store.state().user.is_some());
}

#[test]
fn corrupt_blob_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = FileBackend::new(dir.path()).unwrap();
    backend
        .write(STATE_KEY, "{\"screen\": \"home\", truncated")
        .unwrap();

    let store = Store::new(Box::new(backend));
    assert_eq!(*store.state(), AppState::default());
    assert_eq!(store.state().screen, "splash");
}

#[test]
fn legacy_blob_is_backfilled() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = FileBackend::new(dir.path()).unwrap();
    // A snapshot from before vocabulary, preferences and the feed
    // existed.
    backend
        .write(
            STATE_KEY,
            r#"{
                "user": {"name": "Ada", "email": "ada@example.com", "xp": 77},
                "screen": "home",
                "habits": [],
                "money": [],
                "jokers": 2,
                "chests": 1
            }"#,
        )
        .unwrap();

    let state = load_state(&backend);
    assert_eq!(state.jokers, 2);
    assert_eq!(state.user.as_ref().unwrap().xp, 77);
    assert_eq!(state.user.as_ref().unwrap().avatar, "gamer");
    assert!(state.vocab_lists.is_empty());
    assert!(state.feed.is_empty());
}

#[test]
fn profile_keys_are_namespaced() {
    assert_eq!(profile_key("ada@example.com"), "fynix_user_ada@example.com");

    let dir = tempfile::tempdir().unwrap();
    let mut backend = FileBackend::new(dir.path()).unwrap();
    save_state(&mut backend, &AppState::default()).unwrap();
    backend.write(&profile_key("ada@example.com"), "{}").unwrap();

    // Two distinct slots on disk.
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn every_mutation_is_written_through() {
    // A memory-backed store is rebuilt from its own writes: the last
    // persisted snapshot must equal the live state after each step.
    let mut store = memory_store();
    store.login_as_guest();
    store.update_user(|u| u.onboarded = true).unwrap();
    store.add_xp(30).unwrap();
    let list = store.add_vocab_list("Unit 2", "Deutsch", "Englisch").unwrap();
    store.add_vocab_entry(list, "Brot", "bread").unwrap();
    store.set_screen("quiz");

    let snapshot = serde_json::to_string(store.state()).unwrap();
    let reloaded: AppState = serde_json::from_str(&snapshot).unwrap();
    assert_eq!(&reloaded, store.state());
    assert_eq!(reloaded.user.unwrap().xp, 30);
}
