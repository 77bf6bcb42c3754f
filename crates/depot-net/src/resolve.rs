//! Best-effort public IP discovery.
//!
//! Each address family walks its own ordered list of echo services, strictly
//! one request at a time. The two families run concurrently and share one
//! hard deadline; a branch still running at the deadline is dropped. Branches
//! only look addresses up; whatever they found is cached in the preference
//! store after both have finished, so an abandoned branch never writes.

use std::time::Duration;

use depot_core::{
  address::{is_valid_ipv4, is_valid_ipv6, strip_zone},
  kv::{KeyValueStore, Preferences, keys},
};
use serde::Deserialize;
use tokio::time::{Instant, timeout_at};

use crate::{
  NetConfig, Result,
  fetch::Fetcher,
  interfaces::{InterfaceSource, pick_ipv4, pick_ipv6},
  probe::Ipv6Probe,
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// Where a resolved address came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  /// Already in the preference store; nothing was fetched.
  Cached,
  /// Returned by the echo service at this URL.
  Service(String),
  /// Read off a local network interface.
  Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
  pub address: String,
  pub source:  Source,
}

impl Resolved {
  fn new(address: impl Into<String>, source: Source) -> Self {
    Self { address: address.into(), source }
  }
}

/// Outcome of one resolution cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
  pub ipv4: Option<Resolved>,
  pub ipv6: Option<Resolved>,
}

impl Resolution {
  /// At least one address family resolved.
  pub fn any(&self) -> bool { self.ipv4.is_some() || self.ipv6.is_some() }
}

// ─── Body parsing ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
  ip: String,
}

/// Extract an address from an echo-service body.
///
/// Accepts either a bare address or a `{"ip": "<addr>"}` envelope; anything
/// else, including a valid envelope around an invalid address, is `None`.
pub fn parse_echo_body(body: &str, valid: fn(&str) -> bool) -> Option<String> {
  let body = body.trim();
  if body.is_empty() {
    return None;
  }
  if body.starts_with('{') && body.ends_with('}') {
    let Envelope { ip } = serde_json::from_str(body).ok()?;
    return valid(&ip).then_some(ip);
  }
  valid(body).then(|| body.to_owned())
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Resolves and caches the device's public addresses.
pub struct IpResolver<S, F, I, P> {
  prefs:      Preferences<S>,
  fetcher:    F,
  interfaces: I,
  probe:      P,
  config:     NetConfig,
}

impl<S, F, I, P> IpResolver<S, F, I, P>
where
  S: KeyValueStore,
  F: Fetcher,
  I: InterfaceSource,
  P: Ipv6Probe,
{
  pub fn new(
    prefs: Preferences<S>,
    fetcher: F,
    interfaces: I,
    probe: P,
    config: NetConfig,
  ) -> Self {
    Self { prefs, fetcher, interfaces, probe, config }
  }

  /// Clear both cached addresses, then resolve from scratch.
  pub async fn resolve(&self) -> Result<Resolution> {
    self.prefs.remove(keys::IPV4).await?;
    self.prefs.remove(keys::IPV6).await?;
    self.resolve_cached().await
  }

  /// Resolve, reusing any non-empty cached address without a network call.
  pub async fn resolve_cached(&self) -> Result<Resolution> {
    let deadline = Instant::now() + self.config.overall_timeout();

    let (v4, v6) = tokio::join!(
      timeout_at(deadline, self.resolve_ipv4()),
      timeout_at(deadline, self.resolve_ipv6()),
    );

    let mut ipv4 = v4.unwrap_or_else(|_| {
      tracing::warn!("IPv4 resolution abandoned at deadline");
      Ok(None)
    })?;
    let ipv6 = v6.unwrap_or_else(|_| {
      tracing::warn!("IPv6 resolution abandoned at deadline");
      Ok(None)
    })?;

    if ipv4.is_none()
      && let Some(local) = pick_ipv4(&self.interfaces.addresses())
    {
      tracing::info!(address = %local, "using local interface IPv4");
      ipv4 = Some(Resolved::new(local, Source::Interface));
    }

    self.store(keys::IPV4, ipv4.as_ref()).await?;
    self.store(keys::IPV6, ipv6.as_ref()).await?;

    let resolution = Resolution { ipv4, ipv6 };
    tracing::info!(
      ipv4 = resolution.ipv4.as_ref().map(|r| r.address.as_str()),
      ipv6 = resolution.ipv6.as_ref().map(|r| r.address.as_str()),
      "address resolution finished"
    );
    Ok(resolution)
  }

  async fn store(&self, key: &str, resolved: Option<&Resolved>) -> Result<()> {
    match resolved {
      Some(r) if r.source != Source::Cached => {
        self.prefs.set_string(key, r.address.as_str()).await?;
      }
      _ => {}
    }
    Ok(())
  }

  async fn resolve_ipv4(&self) -> Result<Option<Resolved>> {
    if let Some(cached) = self.prefs.non_empty_string(keys::IPV4).await? {
      return Ok(Some(Resolved::new(cached, Source::Cached)));
    }

    let Some((address, url)) = self
      .first_answer(&self.config.ipv4_services, is_valid_ipv4)
      .await
    else {
      return Ok(None);
    };
    Ok(Some(Resolved::new(address, Source::Service(url))))
  }

  async fn resolve_ipv6(&self) -> Result<Option<Resolved>> {
    if let Some(cached) = self.prefs.non_empty_string(keys::IPV6).await? {
      return Ok(Some(Resolved::new(cached, Source::Cached)));
    }

    let found = if self.probe.supports_ipv6().await {
      self
        .first_answer(&self.config.ipv6_services, is_valid_ipv6)
        .await
        .map(|(address, url)| Resolved::new(address, Source::Service(url)))
    } else {
      tracing::debug!("no IPv6 path; reading local interfaces");
      pick_ipv6(&self.interfaces.addresses())
        .map(|address| Resolved::new(address, Source::Interface))
    };

    let Some(mut resolved) = found else {
      return Ok(None);
    };
    resolved.address = strip_zone(&resolved.address).to_owned();
    Ok(Some(resolved))
  }

  /// Walk `services` in order and return the first valid answer along with
  /// the URL that produced it.
  async fn first_answer(
    &self,
    services: &[String],
    valid: fn(&str) -> bool,
  ) -> Option<(String, String)> {
    let timeout: Duration = self.config.request_timeout();
    for url in services {
      match self.fetcher.get_text(url, timeout).await {
        Ok(body) => match parse_echo_body(&body, valid) {
          Some(address) => {
            tracing::debug!(%url, %address, "echo service answered");
            return Some((address, url.clone()));
          }
          None => tracing::debug!(%url, "unusable echo response"),
        },
        Err(e) => tracing::debug!(%url, error = %e, "echo service failed"),
      }
    }
    None
  }
}
