use super::line::*;

use chrono::{Local, TimeZone, Timelike};
use quill_protocol::Record;

fn record_at_fixed_instant(source: &'static str, tags: &'static [&'static str]) -> Record {
    let instant = Local
        .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .unwrap()
        .with_nanosecond(123_456_000)
        .unwrap();
    Record::at(instant, source, tags, "hi".into())
}

#[test]
fn test_default_line_format() {
    let format = LineFormat::default();
    let record = record_at_fixed_instant("f.cpp::10", &["X"]);

    assert_eq!(
        format.format(&record),
        "2024/01/02 03:04:05.123456 | f.cpp::10 | X | hi"
    );
}

#[test]
fn test_full_source_token() {
    let format = LineFormat::compile("%s", "%H");
    let record = record_at_fixed_instant("src/net/io.rs::77", &[]);
    assert_eq!(format.format(&record), "src/net/io.rs::77");
}

#[test]
fn test_basename_strips_unix_path() {
    let format = LineFormat::compile("%S", "%H");
    let record = record_at_fixed_instant("src/net/io.rs::77", &[]);
    assert_eq!(format.format(&record), "io.rs::77");
}

#[test]
fn test_basename_strips_windows_path() {
    let format = LineFormat::compile("%S", "%H");
    let record = record_at_fixed_instant(r"src\net\io2.rs::78", &[]);
    assert_eq!(format.format(&record), "io2.rs::78");
}

#[test]
fn test_basename_without_path() {
    let format = LineFormat::compile("%S", "%H");
    let record = record_at_fixed_instant("f.cpp::10", &[]);
    assert_eq!(format.format(&record), "f.cpp::10");
}

#[test]
fn test_tags_are_joined() {
    let format = LineFormat::compile("%T", "%H");
    let record = record_at_fixed_instant("line_test.rs::join", &["A", "B"]);
    assert_eq!(format.format(&record), "A, B");
}

#[test]
fn test_tags_stable_across_records_of_same_source() {
    let format = LineFormat::compile("%T", "%H");
    let first = record_at_fixed_instant("line_test.rs::stable", &["A", "B"]);
    let second = record_at_fixed_instant("line_test.rs::stable", &["A", "B"]);
    assert_eq!(format.format(&first), format.format(&second));
}

#[test]
fn test_literal_percent() {
    let format = LineFormat::compile("100%% done", "%H");
    let record = record_at_fixed_instant("a.rs::1", &[]);
    assert_eq!(format.format(&record), "100% done");
}

#[test]
fn test_unrecognised_token_preserved_verbatim() {
    let format = LineFormat::compile("%x %m", "%H");
    let record = record_at_fixed_instant("a.rs::1", &[]);
    assert_eq!(format.format(&record), "%x hi");
}

#[test]
fn test_trailing_percent_preserved() {
    let format = LineFormat::compile("%m%", "%H");
    let record = record_at_fixed_instant("a.rs::1", &[]);
    assert_eq!(format.format(&record), "hi%");
}

#[test]
fn test_message_only() {
    let format = LineFormat::compile("%m", "%H");
    let record = record_at_fixed_instant("a.rs::1", &[]);
    assert_eq!(format.format(&record), "hi");
}

#[test]
fn test_render_reuses_buffer() {
    let format = LineFormat::compile("%m", "%H");
    let record = record_at_fixed_instant("a.rs::1", &[]);

    let mut buffer = String::new();
    format.render(&record, &mut buffer);
    buffer.push('\n');
    format.render(&record, &mut buffer);
    assert_eq!(buffer, "hi\nhi");
}

#[test]
fn test_idempotent_rendering() {
    let format = LineFormat::default();
    let record = record_at_fixed_instant("a.rs::1", &["X"]);
    assert_eq!(format.format(&record), format.format(&record));
}
