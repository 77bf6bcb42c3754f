//! The `KeyValueStore` trait and the typed [`Preferences`] wrapper.
//!
//! The trait is implemented by storage backends (e.g. `depot-store-sqlite`).
//! Higher layers (`depot-net`, `depot-memory`) only ever talk to
//! [`Preferences`], which layers typed accessors over the raw text values.

use std::{future::Future, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Every persisted key, in one place.
pub mod keys {
  pub const FURNITURE_STORAGE: &str = "furnitureStorage";
  pub const EQUIPMENT_STORAGE: &str = "equipmentStorage";
  pub const ACHIEVEMENTS: &str = "achievements";
  pub const TOTAL_POINTS: &str = "totalPoints";
  pub const ONBOARDING_COMPLETED: &str = "onboardingCompleted";

  pub const IPV4: &str = "userIPv4";
  pub const IPV6: &str = "userIPv6";
  pub const DEVICE_TOKEN: &str = "deviceToken";
  pub const DID_REQUEST_NOTIFICATIONS: &str = "didRequestNotifications";

  pub const REDIRECT_URL: &str = "redirectUrl";
  pub const URL_SAVED: &str = "urlSavedFlag";
  pub const REDIRECTS_COMPLETED: &str = "redirectsCompleted";
  pub const FIRST_SERVER_CHECK: &str = "hasCompletedFirstServerCheck";
  pub const CHECK_ERROR: &str = "lastCheckError";

  pub const PROFILE_NAME: &str = "workerName";
  pub const PROFILE_AGE: &str = "collectorAge";
  pub const PROFILE_POSITION: &str = "workPosition";
  pub const PROFILE_PHOTO: &str = "profilePhoto";
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a persistent string-keyed preference store.
///
/// Values are opaque UTF-8 text. All methods return `Send` futures so the
/// store can be shared across tasks.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read a value. Returns `None` if the key was never set or was removed.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Insert or overwrite a value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a key. Removing an absent key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Preferences ─────────────────────────────────────────────────────────────

/// Typed view over a [`KeyValueStore`].
///
/// Cloning is cheap; the store is reference-counted.
#[derive(Debug)]
pub struct Preferences<S> {
  store: Arc<S>,
}

impl<S> Clone for Preferences<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: KeyValueStore> Preferences<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn string(&self, key: &str) -> Result<Option<String>> {
    self.store.get(key).await.map_err(Error::store)
  }

  /// Like [`Self::string`], but treats an empty value as absent.
  pub async fn non_empty_string(&self, key: &str) -> Result<Option<String>> {
    Ok(self.string(key).await?.filter(|s| !s.is_empty()))
  }

  pub async fn set_string(&self, key: &str, value: impl Into<String>) -> Result<()> {
    self.store.set(key, value.into()).await.map_err(Error::store)
  }

  pub async fn remove(&self, key: &str) -> Result<()> {
    self.store.remove(key).await.map_err(Error::store)
  }

  /// Absent or unparseable values read as `false`.
  pub async fn bool(&self, key: &str) -> Result<bool> {
    Ok(self.string(key).await?.is_some_and(|v| v == "true"))
  }

  pub async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
    self.set_string(key, value.to_string()).await
  }

  /// Absent or unparseable values read as `0`.
  pub async fn int(&self, key: &str) -> Result<i64> {
    let Some(raw) = self.string(key).await? else {
      return Ok(0);
    };
    Ok(raw.parse().unwrap_or_else(|_| {
      tracing::warn!(key, value = %raw, "ignoring non-integer preference");
      0
    }))
  }

  pub async fn set_int(&self, key: &str, value: i64) -> Result<()> {
    self.set_string(key, value.to_string()).await
  }

  /// Decode a JSON value. A missing key and a corrupt blob both yield
  /// `None`; the latter is logged.
  pub async fn json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let Some(raw) = self.string(key).await? else {
      return Ok(None);
    };
    match serde_json::from_str(&raw) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        tracing::warn!(key, error = %e, "discarding undecodable preference");
        Ok(None)
      }
    }
  }

  pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    self.set_string(key, raw).await
  }
}
