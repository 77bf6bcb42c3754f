//! Error types for `depot-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("storage not found: {0}")]
  StorageNotFound(Uuid),

  #[error("item {item} not found in storage {storage}")]
  ItemNotFound { storage: Uuid, item: Uuid },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::StorageNotFound(_) | Self::ItemNotFound { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
