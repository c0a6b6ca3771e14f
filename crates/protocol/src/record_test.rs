use super::record::Record;

use chrono::{Local, TimeZone};

#[test]
fn test_record_new_defaults() {
    let record = Record::new("src/main.rs::42", &["LOG_INFO"], "hello".into());

    assert_eq!(record.seq(), 0);
    assert_eq!(record.source(), "src/main.rs::42");
    assert_eq!(record.tags(), &["LOG_INFO"]);
    assert_eq!(record.message(), "hello");
}

#[test]
fn test_record_stamp_seq() {
    let mut record = Record::new("a.rs::1", &[], String::new());
    record.stamp_seq(17);
    assert_eq!(record.seq(), 17);
}

#[test]
fn test_record_explicit_timestamp() {
    let instant = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let record = Record::at(instant, "a.rs::1", &[], "x".into());
    assert_eq!(*record.timestamp(), instant);
}

#[test]
fn test_record_clone_is_independent() {
    let mut record = Record::new("a.rs::1", &["X"], "body".into());
    let copy = record.clone();
    record.stamp_seq(99);

    assert_eq!(copy.seq(), 0);
    assert_eq!(copy.message(), "body");
}
