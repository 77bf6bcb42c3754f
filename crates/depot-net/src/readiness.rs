//! The readiness gate: onboarding continues only once the notification
//! prompt has been answered and address resolution has finished.

use std::future::Future;

use depot_core::kv::{KeyValueStore, Preferences, keys};

/// Asks the user for permission to send notifications.
pub trait PermissionPrompt: Send + Sync {
  /// Resolves once the user has answered; `true` if granted.
  fn request(&self) -> impl Future<Output = bool> + Send + '_;
}

/// A prompt that answers immediately with a fixed decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl PermissionPrompt for FixedAnswer {
  async fn request(&self) -> bool { self.0 }
}

/// Ask `prompt` and remember that the question was asked.
///
/// A failure to record the flag is logged; the user's answer still stands.
pub async fn request_notifications<P, S>(prompt: &P, prefs: &Preferences<S>) -> bool
where
  P: PermissionPrompt,
  S: KeyValueStore,
{
  let granted = prompt.request().await;
  if let Err(e) = prefs.set_bool(keys::DID_REQUEST_NOTIFICATIONS, true).await {
    tracing::warn!(error = %e, "failed to record notification request");
  }
  tracing::info!(granted, "notification permission answered");
  granted
}

/// What the gate saw when it opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
  pub notifications_granted: bool,
  pub addresses_resolved:    bool,
}

/// Waits for both inputs, in any order and with any outcome, then calls its
/// completion exactly once.
///
/// `run` consumes the gate, so a second firing cannot be expressed. The gate
/// imposes no timeout of its own and never retries an input.
pub struct ReadinessGate<F> {
  on_ready: F,
}

impl<F: FnOnce(Readiness)> ReadinessGate<F> {
  pub fn new(on_ready: F) -> Self { Self { on_ready } }

  pub async fn run<P, R>(self, permission: P, resolution: R) -> Readiness
  where
    P: Future<Output = bool>,
    R: Future<Output = bool>,
  {
    let (notifications_granted, addresses_resolved) = tokio::join!(permission, resolution);
    let readiness = Readiness {
      notifications_granted,
      addresses_resolved,
    };
    tracing::info!(notifications_granted, addresses_resolved, "ready to continue");
    (self.on_ready)(readiness);
    readiness
  }
}
