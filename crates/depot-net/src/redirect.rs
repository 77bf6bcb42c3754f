//! The one-time, server-directed redirect decision.
//!
//! A single check request is made per install. Its answer is either a URL,
//! which is saved and loaded once its redirects have settled, or nothing, in
//! which case the app carries on without one. Once the first check has
//! completed the decision is final.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use depot_core::{
  kv::{KeyValueStore, Preferences},
  redirect::RedirectState,
};
use reqwest::Url;
use serde::Deserialize;

use crate::{NetConfig, Result, fetch::Fetcher};

// ─── Messages ────────────────────────────────────────────────────────────────

/// A signal from the page performing the check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
  /// The server answered with a URL.
  InitialUrl(String),
  /// Redirects landed on this domain.
  FinalDomain(String),
  /// The server answered without a URL.
  NoUrl,
  FetchError(String),
}

impl BridgeMessage {
  /// Parse the wire form (`initialUrl:<url>`, `finalDomain:<domain>`,
  /// `noUrlFromJson`, `fetchError:<message>`).
  pub fn parse(body: &str) -> Option<Self> {
    if let Some(url) = body.strip_prefix("initialUrl:") {
      Some(Self::InitialUrl(url.to_owned()))
    } else if let Some(domain) = body.strip_prefix("finalDomain:") {
      Some(Self::FinalDomain(domain.to_owned()))
    } else if let Some(message) = body.strip_prefix("fetchError:") {
      Some(Self::FetchError(message.to_owned()))
    } else if body == "noUrlFromJson" {
      Some(Self::NoUrl)
    } else {
      None
    }
  }
}

#[derive(Deserialize)]
struct CheckResponse {
  #[serde(default)]
  url: Option<String>,
}

/// Interpret a check response body.
pub fn interpret_check_body(body: &str) -> BridgeMessage {
  match serde_json::from_str::<CheckResponse>(body) {
    Ok(CheckResponse { url: Some(url) }) if !url.is_empty() => BridgeMessage::InitialUrl(url),
    Ok(_) => BridgeMessage::NoUrl,
    Err(e) => BridgeMessage::FetchError(e.to_string()),
  }
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectAction {
  None,
  /// Load `url` after `delay`.
  LoadAfter { url: String, delay: Duration },
}

/// Host of `url` with any leading `www.` dropped; empty if unparseable.
pub fn domain_of(url: &str) -> String {
  Url::parse(url)
    .ok()
    .and_then(|u| u.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h).to_owned()))
    .unwrap_or_default()
}

// ─── Launch guard ────────────────────────────────────────────────────────────

/// Per-launch "already done" flags. Shared by every [`RedirectFlow`] built
/// during one run of the app; never persisted.
#[derive(Debug, Default)]
pub struct LaunchGuard {
  check_requested:    AtomicBool,
  initial_url_loaded: AtomicBool,
}

impl LaunchGuard {
  pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

  /// `true` the first time only.
  fn claim_check(&self) -> bool { !self.check_requested.swap(true, Ordering::SeqCst) }

  fn claim_initial_load(&self) -> bool {
    !self.initial_url_loaded.swap(true, Ordering::SeqCst)
  }
}

// ─── Flow ────────────────────────────────────────────────────────────────────

pub struct RedirectFlow<S> {
  prefs:                Preferences<S>,
  guard:                Arc<LaunchGuard>,
  config:               NetConfig,
  navigation_completed: AtomicBool,
}

impl<S: KeyValueStore> RedirectFlow<S> {
  pub fn new(prefs: Preferences<S>, guard: Arc<LaunchGuard>, config: NetConfig) -> Self {
    Self {
      prefs,
      guard,
      config,
      navigation_completed: AtomicBool::new(false),
    }
  }

  pub async fn state(&self) -> Result<RedirectState> {
    Ok(RedirectState::load(&self.prefs).await?)
  }

  /// Whether the check should be made now: never after the first completed
  /// check, and at most once per launch.
  pub async fn begin_check(&self) -> Result<bool> {
    if self.state().await?.has_completed_first_server_check {
      return Ok(false);
    }
    Ok(self.guard.claim_check())
  }

  /// Perform the check request, if due, and apply its answer.
  pub async fn run_check<F: Fetcher>(
    &self,
    fetcher: &F,
    check_url: &str,
    now: DateTime<Utc>,
  ) -> Result<RedirectAction> {
    if !self.begin_check().await? {
      tracing::debug!("server check already made");
      return Ok(RedirectAction::None);
    }

    let message = match self.config.check_not_before {
      Some(not_before) if now < not_before => BridgeMessage::NoUrl,
      _ => match fetcher.get_text(check_url, self.config.request_timeout()).await {
        Ok(body) => interpret_check_body(&body),
        Err(e) => BridgeMessage::FetchError(e.to_string()),
      },
    };
    self.handle(message).await
  }

  /// On a launch where no check is due, reload the saved URL if there is
  /// one, so redirects left unsettled by an earlier launch can settle.
  /// At most once per launch, shared with a freshly checked URL.
  pub async fn resume(&self) -> Result<RedirectAction> {
    let state = self.state().await?;
    if !state.url_saved || state.saved_url.is_empty() {
      return Ok(RedirectAction::None);
    }
    if !self.guard.claim_initial_load() {
      return Ok(RedirectAction::None);
    }
    tracing::debug!(
      url = %state.saved_url,
      settled = state.redirects_completed,
      "reloading saved url"
    );
    Ok(RedirectAction::LoadAfter {
      url:   state.saved_url,
      delay: self.config.initial_load_delay(),
    })
  }

  /// Apply one bridge message to the persisted state.
  pub async fn handle(&self, message: BridgeMessage) -> Result<RedirectAction> {
    let mut state = self.state().await?;

    match message {
      BridgeMessage::InitialUrl(url) => {
        if state.url_saved && state.saved_url == url {
          return Ok(RedirectAction::None);
        }
        state.saved_url = url.clone();
        state.url_saved = true;
        state.redirects_completed = false;
        state.has_completed_first_server_check = true;
        state.check_error = None;
        state.save(&self.prefs).await?;
        tracing::info!(%url, "server check returned a url");

        if !self.guard.claim_initial_load() {
          return Ok(RedirectAction::None);
        }
        if Url::parse(&url).is_err() {
          tracing::warn!(%url, "server returned an unparseable url");
          return Ok(RedirectAction::None);
        }
        Ok(RedirectAction::LoadAfter {
          url,
          delay: self.config.initial_load_delay(),
        })
      }
      BridgeMessage::FinalDomain(domain) => {
        tracing::debug!(%domain, "redirects reported final domain");
        state.redirects_completed = true;
        state.save(&self.prefs).await?;
        Ok(RedirectAction::None)
      }
      BridgeMessage::NoUrl => self.settle_without_url(state, None).await,
      BridgeMessage::FetchError(e) => self.settle_without_url(state, Some(e)).await,
    }
  }

  async fn settle_without_url(
    &self,
    mut state: RedirectState,
    error: Option<String>,
  ) -> Result<RedirectAction> {
    tracing::info!(error = error.as_deref(), "server check settled without a url");
    state.saved_url.clear();
    state.url_saved = false;
    state.redirects_completed = false;
    state.has_completed_first_server_check = true;
    state.check_error = error;
    state.save(&self.prefs).await?;
    Ok(RedirectAction::None)
  }

  /// Called when a page load finishes. While a saved URL is waiting to
  /// settle, and only once per flow, waits the settle delay, then reads
  /// where navigation ended up via `current_url`. An `https://` URL that
  /// differs from the saved one replaces it. Either way redirects are then
  /// marked complete.
  ///
  /// Returns whether this call settled the redirects.
  pub async fn navigation_finished<U>(&self, current_url: U) -> Result<bool>
  where
    U: FnOnce() -> Option<String>,
  {
    let state = self.state().await?;
    if !state.url_saved || state.redirects_completed {
      return Ok(false);
    }
    if self.navigation_completed.swap(true, Ordering::SeqCst) {
      return Ok(false);
    }

    tokio::time::sleep(self.config.settle_delay()).await;

    let mut state = self.state().await?;
    if let Some(current) = current_url().filter(|u| u.starts_with("https://"))
      && current != state.saved_url
    {
      tracing::info!(
        from = %domain_of(&state.saved_url),
        to = %domain_of(&current),
        "redirects settled on a new url"
      );
      state.saved_url = current;
    }
    state.redirects_completed = true;
    state.save(&self.prefs).await?;
    Ok(true)
  }

  /// Carry out a [`RedirectAction`]: wait, load the URL following its
  /// redirects, and settle on wherever it ended.
  pub async fn follow<F: Fetcher>(&self, fetcher: &F, action: RedirectAction) -> Result<()> {
    let RedirectAction::LoadAfter { url, delay } = action else {
      return Ok(());
    };
    tokio::time::sleep(delay).await;

    let landed = match fetcher.final_url(&url, self.config.request_timeout()).await {
      Ok(landed) => landed,
      Err(e) => {
        // Left unsettled so the next launch loads it again.
        tracing::warn!(%url, error = %e, "loading saved url failed");
        return Ok(());
      }
    };
    self.navigation_finished(|| Some(landed)).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use depot_core::redirect::{RedirectPhase, Settlement};

  use super::*;
  use crate::testing::{MapStore, ScriptedFetcher, prefs};

  const CHECK: &str = "https://warrenroad.top/check?app=warrenroad";

  async fn flow() -> RedirectFlow<MapStore> {
    RedirectFlow::new(prefs().await, LaunchGuard::new(), NetConfig::default())
  }

  #[test]
  fn bridge_messages_parse() {
    assert_eq!(
      BridgeMessage::parse("initialUrl:https://a.example/x"),
      Some(BridgeMessage::InitialUrl("https://a.example/x".into()))
    );
    assert_eq!(BridgeMessage::parse("noUrlFromJson"), Some(BridgeMessage::NoUrl));
    assert_eq!(
      BridgeMessage::parse("fetchError:timeout"),
      Some(BridgeMessage::FetchError("timeout".into()))
    );
    assert_eq!(
      BridgeMessage::parse("finalDomain:b.example"),
      Some(BridgeMessage::FinalDomain("b.example".into()))
    );
    assert_eq!(BridgeMessage::parse("hello"), None);
  }

  #[test]
  fn check_body_interpretation() {
    assert_eq!(
      interpret_check_body(r#"{"url":"https://a.example"}"#),
      BridgeMessage::InitialUrl("https://a.example".into())
    );
    assert_eq!(interpret_check_body(r#"{"url":""}"#), BridgeMessage::NoUrl);
    assert_eq!(interpret_check_body("{}"), BridgeMessage::NoUrl);
    assert!(matches!(
      interpret_check_body("<html>"),
      BridgeMessage::FetchError(_)
    ));
  }

  #[test]
  fn domain_drops_www() {
    assert_eq!(domain_of("https://www.a.example/path"), "a.example");
    assert_eq!(domain_of("not a url"), "");
  }

  #[tokio::test]
  async fn initial_url_is_saved_and_scheduled_once() {
    let flow = flow().await;

    let action = flow
      .handle(BridgeMessage::InitialUrl("https://a.example/".into()))
      .await
      .unwrap();
    assert_eq!(
      action,
      RedirectAction::LoadAfter {
        url:   "https://a.example/".into(),
        delay: Duration::from_millis(500),
      }
    );

    let state = flow.state().await.unwrap();
    assert!(state.url_saved && state.has_completed_first_server_check);
    assert!(!state.redirects_completed);

    // Same URL again: ignored.
    let again = flow
      .handle(BridgeMessage::InitialUrl("https://a.example/".into()))
      .await
      .unwrap();
    assert_eq!(again, RedirectAction::None);

    // A different URL is saved but not loaded twice in one launch.
    let other = flow
      .handle(BridgeMessage::InitialUrl("https://b.example/".into()))
      .await
      .unwrap();
    assert_eq!(other, RedirectAction::None);
    assert_eq!(flow.state().await.unwrap().saved_url, "https://b.example/");
  }

  #[tokio::test]
  async fn no_url_and_fetch_error_settle_without_url() {
    let flow = flow().await;
    flow
      .handle(BridgeMessage::InitialUrl("https://a.example/".into()))
      .await
      .unwrap();

    flow.handle(BridgeMessage::NoUrl).await.unwrap();
    let state = flow.state().await.unwrap();
    assert_eq!(state.saved_url, "");
    assert!(!state.url_saved && !state.redirects_completed);
    assert!(state.has_completed_first_server_check);
    assert_eq!(state.phase(), RedirectPhase::Settled(Settlement::WithoutUrl));

    flow
      .handle(BridgeMessage::FetchError("offline".into()))
      .await
      .unwrap();
    assert_eq!(
      flow.state().await.unwrap().phase(),
      RedirectPhase::Settled(Settlement::Error {
        message: "offline".into()
      })
    );
  }

  #[tokio::test]
  async fn check_runs_at_most_once_per_launch() {
    let fetcher = ScriptedFetcher::new().body(CHECK, r#"{"url":""}"#);
    let prefs = prefs().await;
    let guard = LaunchGuard::new();

    // Two flows in one launch, as when a screen is rebuilt.
    let first = RedirectFlow::new(prefs.clone(), Arc::clone(&guard), NetConfig::default());
    let second = RedirectFlow::new(prefs, guard, NetConfig::default());

    first.run_check(&fetcher, CHECK, Utc::now()).await.unwrap();
    second.run_check(&fetcher, CHECK, Utc::now()).await.unwrap();

    assert_eq!(fetcher.attempts(), vec![CHECK]);
  }

  #[tokio::test]
  async fn completed_check_is_never_repeated() {
    let fetcher = ScriptedFetcher::new().body(CHECK, r#"{"url":""}"#);
    let prefs = prefs().await;

    RedirectFlow::new(prefs.clone(), LaunchGuard::new(), NetConfig::default())
      .run_check(&fetcher, CHECK, Utc::now())
      .await
      .unwrap();
    // Next launch: fresh guard, same persisted state.
    RedirectFlow::new(prefs, LaunchGuard::new(), NetConfig::default())
      .run_check(&fetcher, CHECK, Utc::now())
      .await
      .unwrap();

    assert_eq!(fetcher.attempts().len(), 1);
  }

  #[tokio::test]
  async fn unreachable_check_settles_with_error() {
    let flow = flow().await;
    let action = flow
      .run_check(&ScriptedFetcher::new(), CHECK, Utc::now())
      .await
      .unwrap();
    assert_eq!(action, RedirectAction::None);
    assert!(matches!(
      flow.state().await.unwrap().phase(),
      RedirectPhase::Settled(Settlement::Error { .. })
    ));
  }

  #[tokio::test]
  async fn check_before_not_before_skips_the_network() {
    let config = NetConfig {
      check_not_before: Some(Utc::now() + chrono::Duration::days(1)),
      ..NetConfig::default()
    };
    let flow = RedirectFlow::new(prefs().await, LaunchGuard::new(), config);
    let fetcher = ScriptedFetcher::new();

    flow.run_check(&fetcher, CHECK, Utc::now()).await.unwrap();

    assert!(fetcher.attempts().is_empty());
    assert_eq!(
      flow.state().await.unwrap().phase(),
      RedirectPhase::Settled(Settlement::WithoutUrl)
    );
  }

  #[tokio::test(start_paused = true)]
  async fn settle_overwrites_url_after_redirect() {
    let flow = flow().await;
    flow
      .handle(BridgeMessage::InitialUrl("https://a.example/start".into()))
      .await
      .unwrap();

    let started = tokio::time::Instant::now();
    let settled = flow
      .navigation_finished(|| Some("https://www.b.example/landing".into()))
      .await
      .unwrap();

    assert!(settled);
    assert!(started.elapsed() >= Duration::from_secs(3));
    let state = flow.state().await.unwrap();
    assert_eq!(state.saved_url, "https://www.b.example/landing");
    assert_eq!(
      state.phase(),
      RedirectPhase::Settled(Settlement::WithUrl {
        url: "https://www.b.example/landing".into()
      })
    );
  }

  #[tokio::test(start_paused = true)]
  async fn settle_keeps_url_when_unchanged_or_insecure() {
    let flow = flow().await;
    flow
      .handle(BridgeMessage::InitialUrl("https://a.example/".into()))
      .await
      .unwrap();

    flow
      .navigation_finished(|| Some("http://plain.example/".into()))
      .await
      .unwrap();

    let state = flow.state().await.unwrap();
    assert_eq!(state.saved_url, "https://a.example/");
    assert!(state.redirects_completed);
  }

  #[tokio::test(start_paused = true)]
  async fn settle_happens_once() {
    let flow = flow().await;
    flow
      .handle(BridgeMessage::InitialUrl("https://a.example/".into()))
      .await
      .unwrap();

    assert!(flow.navigation_finished(|| None).await.unwrap());
    assert!(!flow.navigation_finished(|| Some("https://c.example/".into())).await.unwrap());
    assert_eq!(flow.state().await.unwrap().saved_url, "https://a.example/");
  }

  #[tokio::test]
  async fn navigation_without_saved_url_does_nothing() {
    let flow = flow().await;
    assert!(!flow.navigation_finished(|| None).await.unwrap());
    assert!(!flow.state().await.unwrap().redirects_completed);
  }

  #[tokio::test(start_paused = true)]
  async fn failed_load_leaves_redirects_unsettled() {
    let fetcher = ScriptedFetcher::new().body(CHECK, r#"{"url":"https://a.example/go"}"#);
    let flow = flow().await;

    let action = flow.run_check(&fetcher, CHECK, Utc::now()).await.unwrap();
    flow.follow(&fetcher, action).await.unwrap();

    let state = flow.state().await.unwrap();
    assert!(!state.redirects_completed);
    assert_eq!(
      state.phase(),
      RedirectPhase::AwaitingRedirectSettle {
        url: "https://a.example/go".into()
      }
    );
  }

  #[tokio::test(start_paused = true)]
  async fn later_launch_resumes_unsettled_url() {
    let prefs = prefs().await;
    RedirectState {
      saved_url: "https://a.example/go".into(),
      url_saved: true,
      redirects_completed: false,
      has_completed_first_server_check: true,
      check_error: None,
    }
    .save(&prefs)
    .await
    .unwrap();

    let fetcher = ScriptedFetcher::new().redirect("https://a.example/go", "https://b.example/final");
    let flow = RedirectFlow::new(prefs, LaunchGuard::new(), NetConfig::default());

    assert_eq!(
      flow.run_check(&fetcher, CHECK, Utc::now()).await.unwrap(),
      RedirectAction::None
    );
    let action = flow.resume().await.unwrap();
    assert_eq!(
      action,
      RedirectAction::LoadAfter {
        url:   "https://a.example/go".into(),
        delay: Duration::from_millis(500),
      }
    );
    // Once per launch.
    assert_eq!(flow.resume().await.unwrap(), RedirectAction::None);

    flow.follow(&fetcher, action).await.unwrap();

    assert_eq!(fetcher.attempts(), vec!["https://a.example/go"]);
    assert_eq!(
      flow.state().await.unwrap().phase(),
      RedirectPhase::Settled(Settlement::WithUrl {
        url: "https://b.example/final".into()
      })
    );
  }

  #[tokio::test]
  async fn resume_without_saved_url_does_nothing() {
    let flow = flow().await;
    flow.handle(BridgeMessage::NoUrl).await.unwrap();
    assert_eq!(flow.resume().await.unwrap(), RedirectAction::None);
  }

  #[tokio::test(start_paused = true)]
  async fn full_check_follows_redirects() {
    let fetcher = ScriptedFetcher::new()
      .body(CHECK, r#"{"url":"https://a.example/go"}"#)
      .redirect("https://a.example/go", "https://b.example/final");
    let flow = flow().await;

    let action = flow.run_check(&fetcher, CHECK, Utc::now()).await.unwrap();
    flow.follow(&fetcher, action).await.unwrap();

    assert_eq!(
      flow.state().await.unwrap().phase(),
      RedirectPhase::Settled(Settlement::WithUrl {
        url: "https://b.example/final".into()
      })
    );
  }
}
