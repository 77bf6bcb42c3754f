//! Persisted redirect state: the outcome of the one-time server check.
//!
//! Four persisted values (a URL and three flags, plus the last error) encode a
//! small state machine. The transitions themselves live in `depot-net`; this
//! module only models, loads and saves the state.

use serde::{Deserialize, Serialize};

use crate::{
  Result,
  kv::{KeyValueStore, Preferences, keys},
};

/// How a settled check ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Settlement {
  WithUrl { url: String },
  WithoutUrl,
  Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RedirectPhase {
  /// No server check has completed for this install.
  Unresolved,
  /// A URL was received and is waiting for its redirects to settle.
  AwaitingRedirectSettle { url: String },
  Settled(Settlement),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectState {
  pub saved_url:                        String,
  pub url_saved:                        bool,
  pub redirects_completed:              bool,
  pub has_completed_first_server_check: bool,
  /// Message of the fetch error that settled the check, if any.
  pub check_error:                      Option<String>,
}

impl RedirectState {
  pub fn phase(&self) -> RedirectPhase {
    if !self.has_completed_first_server_check {
      return RedirectPhase::Unresolved;
    }
    match (self.url_saved, self.redirects_completed, &self.check_error) {
      (true, false, _) => RedirectPhase::AwaitingRedirectSettle {
        url: self.saved_url.clone(),
      },
      (true, true, _) => RedirectPhase::Settled(Settlement::WithUrl {
        url: self.saved_url.clone(),
      }),
      (false, _, Some(message)) => RedirectPhase::Settled(Settlement::Error {
        message: message.clone(),
      }),
      (false, _, None) => RedirectPhase::Settled(Settlement::WithoutUrl),
    }
  }

  pub async fn load<S: KeyValueStore>(prefs: &Preferences<S>) -> Result<Self> {
    Ok(Self {
      saved_url:                        prefs
        .string(keys::REDIRECT_URL)
        .await?
        .unwrap_or_default(),
      url_saved:                        prefs.bool(keys::URL_SAVED).await?,
      redirects_completed:              prefs.bool(keys::REDIRECTS_COMPLETED).await?,
      has_completed_first_server_check: prefs.bool(keys::FIRST_SERVER_CHECK).await?,
      check_error:                      prefs.non_empty_string(keys::CHECK_ERROR).await?,
    })
  }

  pub async fn save<S: KeyValueStore>(&self, prefs: &Preferences<S>) -> Result<()> {
    prefs.set_string(keys::REDIRECT_URL, self.saved_url.as_str()).await?;
    prefs.set_bool(keys::URL_SAVED, self.url_saved).await?;
    prefs
      .set_bool(keys::REDIRECTS_COMPLETED, self.redirects_completed)
      .await?;
    prefs
      .set_bool(keys::FIRST_SERVER_CHECK, self.has_completed_first_server_check)
      .await?;
    match &self.check_error {
      Some(message) => prefs.set_string(keys::CHECK_ERROR, message.as_str()).await,
      None => prefs.remove(keys::CHECK_ERROR).await,
    }
  }
}
