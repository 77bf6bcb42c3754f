//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use depot_core::{
  kv::{KeyValueStore, Preferences, keys},
  storage::{FurnitureCategory, FurnitureStorage, Item},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Raw key/value ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_key_returns_none() {
  let s = store().await;
  assert!(s.get("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn set_then_get() {
  let s = store().await;
  s.set("greeting", "hello".into()).await.unwrap();
  assert_eq!(s.get("greeting").await.unwrap().as_deref(), Some("hello"));
}

#[tokio::test]
async fn set_overwrites_existing_value() {
  let s = store().await;
  s.set("k", "one".into()).await.unwrap();
  s.set("k", "two".into()).await.unwrap();
  assert_eq!(s.get("k").await.unwrap().as_deref(), Some("two"));
  assert_eq!(s.keys().await.unwrap(), vec!["k".to_string()]);
}

#[tokio::test]
async fn remove_is_idempotent() {
  let s = store().await;
  s.set("k", "v".into()).await.unwrap();
  s.remove("k").await.unwrap();
  s.remove("k").await.unwrap();
  assert!(s.get("k").await.unwrap().is_none());
}

#[tokio::test]
async fn file_store_survives_reopen() {
  let dir  = tempfile::tempdir().unwrap();
  let path = dir.path().join("reopen.sqlite");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.set(keys::IPV4, "192.168.1.5".into()).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.get(keys::IPV4).await.unwrap().as_deref(), Some("192.168.1.5"));
}

// ─── Typed preferences ───────────────────────────────────────────────────────

#[tokio::test]
async fn typed_defaults_for_absent_keys() {
  let prefs = Preferences::new(Arc::new(store().await));
  assert!(!prefs.bool(keys::ONBOARDING_COMPLETED).await.unwrap());
  assert_eq!(prefs.int(keys::TOTAL_POINTS).await.unwrap(), 0);
  let none: Option<Vec<FurnitureStorage>> =
    prefs.json(keys::FURNITURE_STORAGE).await.unwrap();
  assert!(none.is_none());
}

#[tokio::test]
async fn corrupt_json_reads_as_none() {
  let s = Arc::new(store().await);
  s.set(keys::FURNITURE_STORAGE, "{not json".into()).await.unwrap();
  let prefs = Preferences::new(s);
  let decoded: Option<Vec<FurnitureStorage>> =
    prefs.json(keys::FURNITURE_STORAGE).await.unwrap();
  assert!(decoded.is_none());
}

#[tokio::test]
async fn storage_blob_round_trips() {
  let prefs = Preferences::new(Arc::new(store().await));

  let mut room = FurnitureStorage::new("Conference Room A", "3rd Floor", "Big table");
  room.add_item(
    Item::new("Chair", FurnitureCategory::Chairs)
      .with_quantity(12)
      .with_value(89.5),
  );
  let blob = vec![room.clone()];

  prefs.set_json(keys::FURNITURE_STORAGE, &blob).await.unwrap();
  let back: Vec<FurnitureStorage> = prefs
    .json(keys::FURNITURE_STORAGE)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(back, blob);
}
