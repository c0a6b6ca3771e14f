use super::tags::TagMemo;

use std::sync::Arc;

#[test]
fn test_memo_joins_in_slice_order() {
    let memo = TagMemo::new();
    let joined = memo.joined("a.rs::10", &["NETWORK", "LOG_INFO"]);
    assert_eq!(&*joined, "NETWORK, LOG_INFO");
}

#[test]
fn test_memo_single_tag_no_separator() {
    let memo = TagMemo::new();
    assert_eq!(&*memo.joined("a.rs::10", &["X"]), "X");
}

#[test]
fn test_memo_empty_tags() {
    let memo = TagMemo::new();
    assert_eq!(&*memo.joined("a.rs::10", &[]), "");
}

#[test]
fn test_memo_first_insert_wins() {
    let memo = TagMemo::new();
    let first = memo.joined("a.rs::10", &["A", "B"]);

    // Same source location with different tags violates the producer
    // contract; the memo keeps the first entry.
    let second = memo.joined("a.rs::10", &["C"]);
    assert_eq!(first, second);
    assert_eq!(memo.len(), 1);
}

#[test]
fn test_memo_distinct_locations() {
    let memo = TagMemo::new();
    memo.joined("a.rs::10", &["A"]);
    memo.joined("a.rs::11", &["B"]);
    assert_eq!(memo.len(), 2);
}

#[test]
fn test_memo_stable_under_concurrent_inserts() {
    let memo = Arc::new(TagMemo::new());
    let mut handles = Vec::new();

    for _ in 0..8 {
        let memo = Arc::clone(&memo);
        handles.push(std::thread::spawn(move || {
            for _ in 0..1000 {
                assert_eq!(&*memo.joined("hot.rs::1", &["A", "B"]), "A, B");
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(memo.len(), 1);
}
