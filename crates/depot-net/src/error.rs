//! Error type for `depot-net`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] depot_core::Error),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{url} returned status {status}")]
  Status { url: String, status: u16 },

  #[error("{0} is unreachable")]
  Unreachable(String),

  #[error("invalid url: {0}")]
  InvalidUrl(String),

  #[error("invalid socket address: {0}")]
  InvalidAddress(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
