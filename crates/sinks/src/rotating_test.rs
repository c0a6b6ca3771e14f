use super::*;

use chrono::{TimeZone, Timelike};
use quill_protocol::Record;
use tempfile::TempDir;

fn batch_of(messages: &[&str]) -> Arc<Batch> {
    let records = messages
        .iter()
        .map(|m| Record::new("rotating_test.rs::1", &[], m.to_string()))
        .collect();
    Arc::new(Batch::new(records))
}

async fn message_only_sink(base: &Path) -> Arc<RotatingFileSink> {
    let sink = RotatingFileSink::new(base);
    sink.set_format("%m", "%H").await;
    sink
}

// =============================================================================
// Filename construction
// =============================================================================

#[test]
fn test_numbered_file_name() {
    assert_eq!(
        numbered(Path::new("/var/log/app.log"), 3),
        PathBuf::from("/var/log/app.log.3")
    );
}

#[test]
fn test_daily_name_after_trigger_uses_today() {
    let now = Local.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
    let name = daily_file_name(Path::new("app.log"), 6, 30, 0, now);
    assert_eq!(name, PathBuf::from("app.log.2024.3.7"));
}

#[test]
fn test_daily_name_before_trigger_uses_yesterday() {
    let now = Local.with_ymd_and_hms(2024, 3, 7, 5, 0, 0).unwrap();
    let name = daily_file_name(Path::new("app.log"), 6, 30, 0, now);
    assert_eq!(name, PathBuf::from("app.log.2024.3.6"));
}

#[test]
fn test_daily_name_crosses_month_boundary() {
    let now = Local.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let name = daily_file_name(Path::new("app.log"), 6, 0, 0, now);
    assert_eq!(name, PathBuf::from("app.log.2024.2.29"));
}

#[test]
fn test_daily_name_has_no_zero_padding() {
    let now = Local.with_ymd_and_hms(2025, 1, 2, 23, 0, 0).unwrap();
    let name = daily_file_name(Path::new("app.log"), 6, 0, 0, now);
    assert_eq!(name, PathBuf::from("app.log.2025.1.2"));
}

#[test]
fn test_next_daily_trigger_later_today() {
    let now = Local.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap();
    let wait = until_next_daily_trigger(now, 10, 0, 30);
    assert_eq!(wait, Duration::from_secs(30));
}

#[test]
fn test_next_daily_trigger_wraps_to_tomorrow() {
    let now = Local.with_ymd_and_hms(2024, 3, 7, 23, 59, 30).unwrap();
    let wait = until_next_daily_trigger(now, 0, 0, 0);
    assert_eq!(wait, Duration::from_secs(30));
}

// =============================================================================
// Cascading rename
// =============================================================================

#[test]
fn test_cascade_rename_shifts_and_drops_oldest() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("app.log");

    fs::write(&base, "current").unwrap();
    fs::write(numbered(&base, 1), "one").unwrap();
    fs::write(numbered(&base, 2), "two").unwrap();

    cascade_rename(&base, 3);

    assert!(!base.exists());
    assert_eq!(fs::read_to_string(numbered(&base, 1)).unwrap(), "current");
    assert_eq!(fs::read_to_string(numbered(&base, 2)).unwrap(), "one");
    assert!(!numbered(&base, 3).exists());
}

#[test]
fn test_cascade_rename_with_gaps() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("app.log");

    fs::write(&base, "current").unwrap();
    fs::write(numbered(&base, 2), "two").unwrap();

    cascade_rename(&base, 4);

    assert_eq!(fs::read_to_string(numbered(&base, 1)).unwrap(), "current");
    assert_eq!(fs::read_to_string(numbered(&base, 3)).unwrap(), "two");
    assert!(!numbered(&base, 2).exists());
}

// =============================================================================
// Write path
// =============================================================================

#[tokio::test]
async fn test_append_mode_writes_lines() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("app.log");

    let sink = message_only_sink(&base).await;
    sink.append_only().await;
    sink.handle(batch_of(&["first", "second"])).await;

    assert_eq!(fs::read_to_string(&base).unwrap(), "first\nsecond\n");
}

#[tokio::test]
async fn test_lazy_open_on_first_batch() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("lazy.log");

    let sink = message_only_sink(&base).await;
    assert!(!base.exists());

    sink.handle(batch_of(&["hello"])).await;
    assert!(base.exists());
}

#[tokio::test]
async fn test_filtered_records_are_not_written() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("app.log");

    let sink = message_only_sink(&base).await;
    sink.append_only().await;
    sink.add_filter(Box::new(|r| r.tags().contains(&"keep")))
        .await;
    sink.disable_cache().await;

    let records = vec![
        Record::new("a.rs::1", &["keep"], "yes".into()),
        Record::new("a.rs::2", &["drop"], "no".into()),
    ];
    sink.handle(Arc::new(Batch::new(records))).await;

    assert_eq!(fs::read_to_string(&base).unwrap(), "yes\n");
}

#[tokio::test]
async fn test_size_rotation_produces_cascade() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("size.log");

    let sink = message_only_sink(&base).await;
    sink.rotate_at_size(100, 3).await;

    // 50 records of ~30 bytes, one batch each so size accrues per flush.
    for i in 0..50 {
        sink.handle(batch_of(&[&format!("record-{i:02}-xxxxxxxxxxxxxxxxxx")]))
            .await;
    }

    assert!(base.exists());
    assert!(fs::metadata(&base).unwrap().len() > 0);
    assert!(numbered(&base, 1).exists());
    assert!(numbered(&base, 2).exists());
    assert!(!numbered(&base, 3).exists());
}

#[tokio::test]
async fn test_size_rotation_bound() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("bound.log");

    let sink = message_only_sink(&base).await;
    sink.rotate_at_size(64, 2).await;

    let line = "x".repeat(20);
    for _ in 0..16 {
        sink.handle(batch_of(&[&line])).await;
    }

    // Every rotated-out file is bounded by cap + the longest line.
    let rotated = numbered(&base, 1);
    assert!(rotated.exists());
    assert!(fs::metadata(&rotated).unwrap().len() <= 64 + 21);
}

#[tokio::test]
async fn test_daily_mode_opens_dated_file() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("daily.log");

    let sink = message_only_sink(&base).await;
    // A trigger one hour ago: the dated name must use today.
    let an_hour_ago = Local::now() - chrono::Duration::hours(1);
    sink.rotate_at_time(an_hour_ago.hour(), 0, 0).await;
    sink.handle(batch_of(&["dated"])).await;

    let expected = daily_file_name(&base, an_hour_ago.hour(), 0, 0, Local::now());
    assert_eq!(fs::read_to_string(expected).unwrap(), "dated\n");
}

#[tokio::test]
async fn test_disk_full_drops_batch() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("full.log");

    let sink = message_only_sink(&base).await;
    sink.append_only().await;

    sink.inner.disk_full.store(true, Ordering::Relaxed);
    sink.handle(batch_of(&["dropped"])).await;
    assert_eq!(fs::read_to_string(&base).unwrap(), "");

    sink.inner.disk_full.store(false, Ordering::Relaxed);
    sink.handle(batch_of(&["written"])).await;
    assert_eq!(fs::read_to_string(&base).unwrap(), "written\n");
}

#[tokio::test]
async fn test_interval_worker_rotates() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("interval.log");

    let sink = message_only_sink(&base).await;
    sink.rotate_after_elapsed(Duration::from_millis(300), 3).await;
    sink.handle(batch_of(&["before"])).await;

    tokio::time::sleep(Duration::from_millis(450)).await;

    sink.handle(batch_of(&["after"])).await;
    assert!(numbered(&base, 1).exists());
    assert_eq!(fs::read_to_string(&base).unwrap(), "after\n");
}

#[tokio::test]
async fn test_mode_transition_reopens() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("transition.log");

    let sink = message_only_sink(&base).await;
    sink.rotate_at_size(1_000_000, 3).await;
    sink.handle(batch_of(&["one"])).await;

    sink.append_only().await;
    sink.handle(batch_of(&["two"])).await;

    assert_eq!(fs::read_to_string(&base).unwrap(), "one\ntwo\n");
}
