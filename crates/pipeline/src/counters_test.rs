use super::*;

#[test]
fn test_count_of_increments_per_call() {
    assert_eq!(count_of("counters_test.rs::a"), 0);
    assert_eq!(count_of("counters_test.rs::a"), 1);
    assert_eq!(count_of("counters_test.rs::a"), 2);
}

#[test]
fn test_count_of_is_per_location() {
    assert_eq!(count_of("counters_test.rs::b1"), 0);
    assert_eq!(count_of("counters_test.rs::b2"), 0);
    assert_eq!(count_of("counters_test.rs::b1"), 1);
}

#[test]
fn test_count_of_shared_across_threads() {
    let total: u32 = 8 * 100;
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..100 {
                    count_of("counters_test.rs::shared");
                }
            });
        }
    });
    assert_eq!(count_of("counters_test.rs::shared"), total);
}

#[test]
fn test_count_of_id_is_per_thread() {
    assert_eq!(count_of_id(7, "counters_test.rs::id"), 0);
    assert_eq!(count_of_id(7, "counters_test.rs::id"), 1);

    // A fresh thread starts from zero for the same (id, location).
    std::thread::spawn(|| {
        assert_eq!(count_of_id(7, "counters_test.rs::id"), 0);
    })
    .join()
    .unwrap();

    assert_eq!(count_of_id(7, "counters_test.rs::id"), 2);
}

#[test]
fn test_count_of_id_keys_on_id_and_location() {
    assert_eq!(count_of_id(1, "counters_test.rs::pair"), 0);
    assert_eq!(count_of_id(2, "counters_test.rs::pair"), 0);
    assert_eq!(count_of_id(1, "counters_test.rs::pair"), 1);
}
