//! Persistence tests for the flat-file index.

mod common;

use common::{mock_pipeline, record};
use docindex::{Index, IndexConfig};

#[test]
fn fresh_index_is_persisted_empty() {
    let dir = tempfile::tempdir().unwrap();
    let index = Index::open(None, dir.path()).unwrap();

    assert_eq!(index.id().len(), 6);
    assert_eq!(index.path(), dir.path().join(format!("{}.json", index.id())));
    assert_eq!(std::fs::read_to_string(index.path()).unwrap(), "[]");

    let reloaded = Index::load(index.path()).unwrap();
    assert!(reloaded.is_empty());
    assert_eq!(reloaded.id(), index.id());
}

#[test]
fn missing_path_creates_a_new_index_in_the_index_dir() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("elsewhere").join("424242.json");

    let index = Index::open(Some(&missing), dir.path()).unwrap();
    assert!(index.path().starts_with(dir.path()));
    assert!(index.path().exists());
    assert!(!missing.exists());
}

#[test]
fn existing_path_is_loaded_and_adopts_its_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("111111", &[("alpha", vec![1.0, 0.0])])).unwrap();

    let renamed = dir.path().join("777777.json");
    std::fs::copy(index.path(), &renamed).unwrap();

    let opened = Index::open(Some(&renamed), dir.path()).unwrap();
    assert_eq!(opened.id(), "777777");
    assert_eq!(opened.documents(), index.documents());
}

#[tokio::test]
async fn sync_then_reload_round_trips_records() {
    let dir = tempfile::tempdir().unwrap();
    let doc_path = dir.path().join("notes.txt");
    std::fs::write(&doc_path, "first paragraph\n\nsecond paragraph").unwrap();

    let pipeline = mock_pipeline(IndexConfig::default());
    let mut index = Index::create(dir.path().join("indexes")).unwrap();
    index.add(pipeline.ingest(&doc_path).await.unwrap()).unwrap();
    index.add(record("222222", &[("beta", vec![0.5, 0.25])])).unwrap();

    let before = index.documents().to_vec();
    index.reload().unwrap();
    assert_eq!(index.documents(), before.as_slice());
    assert_eq!(index.chunk_count(), 3);
}

#[test]
fn sync_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("333333", &[("gamma", vec![0.1, 0.2, 0.3])])).unwrap();

    let first = std::fs::read(index.path()).unwrap();
    index.sync().unwrap();
    let second = std::fs::read(index.path()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn sync_leaves_no_temporary_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("444444", &[("delta", vec![1.0])])).unwrap();
    index.sync().unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn colliding_record_ids_are_rekeyed() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();

    let first = index.add(record("555555", &[("a", vec![1.0]), ("b", vec![0.0])])).unwrap();
    let second = index.add(record("555555", &[("c", vec![1.0]), ("d", vec![0.0])])).unwrap();

    assert_eq!(first, "555555");
    assert_ne!(second, first);
    let rekeyed = index.get(&second).unwrap();
    let chunk_ids: Vec<_> = rekeyed.data.iter().map(|c| c.id.clone()).collect();
    assert_eq!(chunk_ids, [format!("{second}-1"), format!("{second}-2")]);
}

#[test]
fn remove_drops_the_record_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("666666", &[("a", vec![1.0])])).unwrap();
    index.add(record("888888", &[("b", vec![1.0])])).unwrap();

    let removed = index.remove("666666").unwrap().unwrap();
    assert_eq!(removed.id, "666666");

    let reloaded = Index::load(index.path()).unwrap();
    let ids: Vec<_> = reloaded.documents().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["888888"]);
}

#[test]
fn reload_discards_unsynced_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    index.add(record("999999", &[("a", vec![1.0])])).unwrap();

    std::fs::write(index.path(), "[]").unwrap();
    index.reload().unwrap();
    assert!(index.is_empty());
}
