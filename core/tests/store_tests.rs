use search_core::store::PostingStore;
use tempfile::tempdir;

#[test]
fn adding_twice_equals_adding_once() {
    let dir = tempdir().unwrap();
    let store = PostingStore::open(dir.path().join("index.db")).unwrap();
    store.add_document("cat", "1").unwrap();
    let once = store.get("cat").unwrap();
    store.add_document("cat", "1").unwrap();
    assert_eq!(store.get("cat").unwrap(), once);
}

#[test]
fn postings_accumulate_regardless_of_order() {
    let dir = tempdir().unwrap();
    let forward = PostingStore::open(dir.path().join("a.db")).unwrap();
    forward.add_document("cat", "1").unwrap();
    forward.add_document("cat", "2").unwrap();

    let backward = PostingStore::open(dir.path().join("b.db")).unwrap();
    backward.add_document("cat", "2").unwrap();
    backward.add_document("cat", "1").unwrap();

    let list = forward.postings("cat").unwrap();
    assert_eq!(list.iter().collect::<Vec<_>>(), vec!["1", "2"]);
    assert_eq!(forward.get("cat").unwrap(), backward.get("cat").unwrap());
    assert_eq!(forward.get("cat").unwrap().unwrap(), b"1,2");
}

#[test]
fn absent_token_has_no_postings() {
    let dir = tempdir().unwrap();
    let store = PostingStore::open(dir.path().join("index.db")).unwrap();
    assert!(store.get("missing").unwrap().is_none());
    assert!(store.postings("missing").unwrap().is_empty());
}

#[test]
fn postings_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");
    {
        let store = PostingStore::open(&path).unwrap();
        store.add_document("dog", "7").unwrap();
        store.add_document("dog", "3").unwrap();
        store.flush().unwrap();
    }
    let store = PostingStore::open(&path).unwrap();
    assert_eq!(store.get("dog").unwrap().unwrap(), b"3,7");
    assert_eq!(store.term_count(), 1);
}
