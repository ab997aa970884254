//! Integration tests for the file-backed roster store.

use tourney_platform::{JsonFileRoster, PlatformError, RosterStore};
use tourney_protocol::MemberId;

#[tokio::test]
async fn test_list_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let roster = JsonFileRoster::new(dir.path().join("roster.json"));
    assert!(roster.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_put_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.json");

    let roster = JsonFileRoster::new(&path);
    roster.put(MemberId(30)).await.unwrap();
    roster.put(MemberId(10)).await.unwrap();
    roster.put(MemberId(20)).await.unwrap();
    roster.delete(MemberId(20)).await.unwrap();
    drop(roster);

    let reopened = JsonFileRoster::new(&path);
    assert_eq!(reopened.list().await.unwrap(), vec![MemberId(10), MemberId(30)]);
    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw, "[10,30]");
}

#[tokio::test]
async fn test_clear_empties_file() {
    let dir = tempfile::tempdir().unwrap();
    let roster = JsonFileRoster::new(dir.path().join("roster.json"));
    roster.put(MemberId(1)).await.unwrap();
    roster.clear().await.unwrap();
    assert!(roster.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_file_is_codec_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.json");
    std::fs::write(&path, "not json").unwrap();
    let roster = JsonFileRoster::new(&path);
    assert!(matches!(roster.list().await, Err(PlatformError::Codec(_))));
}

#[tokio::test]
async fn test_concurrent_puts_keep_every_id() {
    let dir = tempfile::tempdir().unwrap();
    let roster = std::sync::Arc::new(JsonFileRoster::new(dir.path().join("roster.json")));

    let mut handles = Vec::new();
    for id in 1..=20 {
        let roster = roster.clone();
        handles.push(tokio::spawn(async move { roster.put(MemberId(id)).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(roster.list().await.unwrap().len(), 20);
}
