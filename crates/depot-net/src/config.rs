//! Tunables for the network flows, deserialised from the `[net]` section of
//! the application config.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network configuration. Every field has a default, so an empty `[net]`
/// table is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
  /// IPv4 echo services, tried strictly in order.
  pub ipv4_services:         Vec<String>,
  /// IPv6 echo services, tried strictly in order.
  pub ipv6_services:         Vec<String>,
  pub request_timeout_ms:    u64,
  /// Hard bound on a whole resolution cycle.
  pub overall_timeout_ms:    u64,
  pub ipv6_probe_timeout_ms: u64,
  /// Address the IPv6 path probe routes towards; nothing is sent.
  pub ipv6_probe_target:     String,
  /// Host serving `/check`.
  pub check_host:            String,
  /// Value of the `app` query parameter.
  pub app:                   String,
  pub initial_load_delay_ms: u64,
  pub settle_delay_ms:       u64,
  /// Before this instant the server check resolves to "no URL" without any
  /// network traffic.
  pub check_not_before:      Option<DateTime<Utc>>,
}

impl Default for NetConfig {
  fn default() -> Self {
    Self {
      ipv4_services:         [
        "https://api.ipify.org",
        "https://ipinfo.io/ip",
        "https://api.my-ip.io/ip",
        "https://checkip.amazonaws.com",
        "https://2ip.ua/ru/api/my-ip",
      ]
      .map(str::to_owned)
      .to_vec(),
      ipv6_services:         [
        "https://api64.ipify.org",
        "https://v6.ident.me",
        "https://ipv6.icanhazip.com",
        "https://ipv6.wtfismyip.com/text",
        "https://2ip.ua/ru/api/my-ip",
      ]
      .map(str::to_owned)
      .to_vec(),
      request_timeout_ms:    5_000,
      overall_timeout_ms:    10_000,
      ipv6_probe_timeout_ms: 3_000,
      ipv6_probe_target:     "[2001:4860:4860::8888]:53".to_owned(),
      check_host:            "warrenroad.top".to_owned(),
      app:                   "warrenroad".to_owned(),
      initial_load_delay_ms: 500,
      settle_delay_ms:       3_000,
      check_not_before:      None,
    }
  }
}

impl NetConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }

  pub fn overall_timeout(&self) -> Duration {
    Duration::from_millis(self.overall_timeout_ms)
  }

  pub fn ipv6_probe_timeout(&self) -> Duration {
    Duration::from_millis(self.ipv6_probe_timeout_ms)
  }

  pub fn initial_load_delay(&self) -> Duration {
    Duration::from_millis(self.initial_load_delay_ms)
  }

  pub fn settle_delay(&self) -> Duration {
    Duration::from_millis(self.settle_delay_ms)
  }
}
