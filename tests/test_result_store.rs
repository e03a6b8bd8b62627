//! Upload history on a real database file

use card_grade::store::{NewUpload, ResultStore};
use tempfile::TempDir;

#[test]
fn newest_first_and_latest() {
    let store = ResultStore::open_in_memory().unwrap();
    let a = store.insert(NewUpload::new("/photos/a.jpg", "PSA 9")).unwrap();
    let b = store.insert(NewUpload::new("/photos/b.jpg", "PSA 8")).unwrap();
    let c = store.insert(NewUpload::new("/photos/c.jpg", "PSA 10")).unwrap();

    let ids: Vec<i64> = store.get_all().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![c.id, b.id, a.id]);
    assert_eq!(store.get_latest().unwrap(), Some(c));
}

#[test]
fn get_by_id_returns_stored_fields() {
    let store = ResultStore::open_in_memory().unwrap();
    let verdict = "Centering: 9 - slightly off left\nCorners: 8\n\nOverall: PSA 8";
    let stored = store
        .insert(NewUpload::new("/photos/IMG_1.jpg", verdict))
        .unwrap();

    let fetched = store.get_by_id(stored.id).unwrap().unwrap();
    assert_eq!(fetched, stored);
    assert_eq!(fetched.verdict, verdict);
    assert_eq!(fetched.image_path.to_str(), Some("/photos/IMG_1.jpg"));
}

#[test]
fn delete_all_empties_history() {
    let store = ResultStore::open_in_memory().unwrap();
    store.insert(NewUpload::new("/a.jpg", "PSA 9")).unwrap();
    store.insert(NewUpload::new("/b.jpg", "PSA 7")).unwrap();

    assert_eq!(store.delete_all().unwrap(), 2);
    assert!(store.get_all().unwrap().is_empty());
    assert_eq!(store.get_latest().unwrap(), None);
    assert_eq!(store.delete_all().unwrap(), 0);
}

#[test]
fn history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("uploads.db");

    let first_id = {
        let store = ResultStore::open(&path).unwrap();
        store.insert(NewUpload::new("/a.jpg", "PSA 6")).unwrap().id
    };
    assert!(path.exists());

    let store = ResultStore::open(&path).unwrap();
    let latest = store.get_latest().unwrap().unwrap();
    assert_eq!(latest.id, first_id);
    assert_eq!(latest.verdict, "PSA 6");

    let next = store.insert(NewUpload::new("/b.jpg", "PSA 7")).unwrap();
    assert!(next.id > first_id);
}

#[test]
fn concurrent_inserts_get_distinct_ids() {
    let store = std::sync::Arc::new(ResultStore::open_in_memory().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                store
                    .insert(NewUpload::new(format!("/p{i}.jpg"), format!("PSA {i}")))
                    .unwrap()
                    .id
            })
        })
        .collect();

    let mut ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(store.count().unwrap(), 8);
}
