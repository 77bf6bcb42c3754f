//! The HTTP seam: one GET at a time, each with its own timeout.

use std::{future::Future, time::Duration};

use reqwest::Client;

use crate::{Error, Result};

/// Minimal HTTP surface used by the resolution chain and the redirect flow.
pub trait Fetcher: Send + Sync {
  /// GET `url` and return the body as text. Non-2xx statuses are errors.
  fn get_text<'a>(
    &'a self,
    url: &'a str,
    timeout: Duration,
  ) -> impl Future<Output = Result<String>> + Send + 'a;

  /// Load `url`, following redirects, and return where navigation ended.
  fn final_url<'a>(
    &'a self,
    url: &'a str,
    timeout: Duration,
  ) -> impl Future<Output = Result<String>> + Send + 'a;
}

/// [`Fetcher`] backed by `reqwest`.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpFetcher {
  client: Client,
}

impl HttpFetcher {
  pub fn new() -> Result<Self> {
    let client = Client::builder()
      .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }
}

impl Fetcher for HttpFetcher {
  async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
    let resp = self.client.get(url).timeout(timeout).send().await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status {
        url:    url.to_owned(),
        status: status.as_u16(),
      });
    }
    Ok(resp.text().await?)
  }

  async fn final_url(&self, url: &str, timeout: Duration) -> Result<String> {
    let resp = self.client.get(url).timeout(timeout).send().await?;
    // Any landing page counts as a finished navigation, error statuses too.
    Ok(resp.url().to_string())
  }
}
