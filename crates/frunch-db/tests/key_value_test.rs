//! Integration tests for the SQLite key-value store.

use frunch_core::defaults::SYNC_CURSOR_KEY;
use frunch_core::KeyValueRepository;
use frunch_db::Database;

#[tokio::test]
async fn test_missing_key_is_absent() {
    let db = Database::connect_in_memory().await.unwrap();
    assert_eq!(db.key_value.get(SYNC_CURSOR_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_set_then_get() {
    let db = Database::connect_in_memory().await.unwrap();
    db.key_value.set(SYNC_CURSOR_KEY, "1234").await.unwrap();
    assert_eq!(
        db.key_value.get(SYNC_CURSOR_KEY).await.unwrap().as_deref(),
        Some("1234")
    );
}

#[tokio::test]
async fn test_set_overwrites_existing_value() {
    let db = Database::connect_in_memory().await.unwrap();
    db.key_value.set(SYNC_CURSOR_KEY, "1").await.unwrap();
    db.key_value.set(SYNC_CURSOR_KEY, "2").await.unwrap();
    assert_eq!(
        db.key_value.get(SYNC_CURSOR_KEY).await.unwrap().as_deref(),
        Some("2")
    );
}

#[tokio::test]
async fn test_keys_are_independent() {
    let db = Database::connect_in_memory().await.unwrap();
    db.key_value.set("a", "x").await.unwrap();
    db.key_value.set("b", "y").await.unwrap();
    assert_eq!(db.key_value.get("a").await.unwrap().as_deref(), Some("x"));
    assert_eq!(db.key_value.get("b").await.unwrap().as_deref(), Some("y"));
}
