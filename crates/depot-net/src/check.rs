//! Device identity and the server check request.

use depot_core::{
  address::{is_link_local_v6, strip_zone},
  kv::{KeyValueStore, Preferences, keys},
};
use reqwest::Url;

use crate::{Error, NetConfig, Result};

/// Store a push token as lowercase hex and return the encoded form.
pub async fn save_device_token<S: KeyValueStore>(
  prefs: &Preferences<S>,
  token: &[u8],
) -> Result<String> {
  let encoded = hex::encode(token);
  prefs.set_string(keys::DEVICE_TOKEN, encoded.as_str()).await?;
  Ok(encoded)
}

pub async fn device_token<S: KeyValueStore>(prefs: &Preferences<S>) -> Result<Option<String>> {
  Ok(prefs.non_empty_string(keys::DEVICE_TOKEN).await?)
}

pub async fn did_request_notifications<S: KeyValueStore>(
  prefs: &Preferences<S>,
) -> Result<bool> {
  Ok(prefs.bool(keys::DID_REQUEST_NOTIFICATIONS).await?)
}

/// The IPv6 value sent to the server: zone stripped, link-local blanked.
pub fn reportable_ipv6(ipv6: &str) -> &str {
  let ipv6 = strip_zone(ipv6);
  if is_link_local_v6(ipv6) { "" } else { ipv6 }
}

/// `https://<host>/check?app=…&ipv4=…&ipv6=…&deviceToken=…`
pub fn build_check_url(
  host: &str,
  app: &str,
  ipv4: &str,
  ipv6: &str,
  device_token: &str,
) -> Result<Url> {
  Url::parse_with_params(
    &format!("https://{host}/check"),
    [
      ("app", app),
      ("ipv4", ipv4),
      ("ipv6", reportable_ipv6(ipv6)),
      ("deviceToken", device_token),
    ],
  )
  .map_err(|e| Error::InvalidUrl(format!("{host}: {e}")))
}

/// Build the check URL from whatever is cached. Missing values are sent as
/// empty parameters.
pub async fn check_url<S: KeyValueStore>(
  prefs: &Preferences<S>,
  config: &NetConfig,
) -> Result<Url> {
  let ipv4  = prefs.string(keys::IPV4).await?.unwrap_or_default();
  let ipv6  = prefs.string(keys::IPV6).await?.unwrap_or_default();
  let token = prefs.string(keys::DEVICE_TOKEN).await?.unwrap_or_default();
  build_check_url(&config.check_host, &config.app, &ipv4, &ipv6, &token)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::prefs;

  #[test]
  fn check_url_carries_all_parameters() {
    let url = build_check_url(
      "warrenroad.top",
      "warrenroad",
      "203.0.113.7",
      "2001:db8::1%en0",
      "ab01",
    )
    .unwrap();
    assert_eq!(url.host_str(), Some("warrenroad.top"));
    assert_eq!(url.path(), "/check");
    let pairs: Vec<(String, String)> = url
      .query_pairs()
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect();
    assert_eq!(
      pairs,
      vec![
        ("app".into(), "warrenroad".into()),
        ("ipv4".into(), "203.0.113.7".into()),
        ("ipv6".into(), "2001:db8::1".into()),
        ("deviceToken".into(), "ab01".into()),
      ]
    );
  }

  #[test]
  fn link_local_ipv6_is_not_reported() {
    assert_eq!(reportable_ipv6("fe80::1%en0"), "");
    assert_eq!(reportable_ipv6("fd00::1"), "fd00::1");
  }

  #[tokio::test]
  async fn check_url_tolerates_empty_cache() {
    let prefs = prefs().await;
    let url = check_url(&prefs, &NetConfig::default()).await.unwrap();
    assert_eq!(
      url.as_str(),
      "https://warrenroad.top/check?app=warrenroad&ipv4=&ipv6=&deviceToken="
    );
  }

  #[tokio::test]
  async fn device_token_is_hex_encoded() {
    let prefs = prefs().await;
    let encoded = save_device_token(&prefs, &[0x0a, 0xff, 0x10]).await.unwrap();
    assert_eq!(encoded, "0aff10");
    assert_eq!(device_token(&prefs).await.unwrap().as_deref(), Some("0aff10"));
  }
}
