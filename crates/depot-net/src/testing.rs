//! Scripted stand-ins for the network seams.

use std::{collections::HashMap, convert::Infallible, sync::Arc, sync::Mutex, time::Duration};

use depot_core::kv::{KeyValueStore, Preferences};

use crate::{
  Error, Result,
  fetch::Fetcher,
  interfaces::{InterfaceAddr, InterfaceSource},
  probe::Ipv6Probe,
};

/// Map-backed store. Every call completes without yielding, which keeps
/// paused-clock tests from auto-advancing mid-write.
#[derive(Default)]
pub struct MapStore(Mutex<HashMap<String, String>>);

impl KeyValueStore for MapStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    Ok(self.0.lock().unwrap().get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> Result<(), Infallible> {
    self.0.lock().unwrap().insert(key.to_owned(), value);
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self.0.lock().unwrap().remove(key);
    Ok(())
  }
}

pub async fn prefs() -> Preferences<MapStore> {
  Preferences::new(Arc::new(MapStore::default()))
}

enum Scripted {
  Body { body: String, delay: Duration },
  Redirect(String),
}

/// Answers from a fixed table; unknown URLs are unreachable. Every call is
/// logged in order.
#[derive(Default)]
pub struct ScriptedFetcher {
  responses: HashMap<String, Scripted>,
  attempts:  Mutex<Vec<String>>,
}

impl ScriptedFetcher {
  pub fn new() -> Self { Self::default() }

  pub fn body(self, url: &str, body: &str) -> Self {
    self.slow_body(url, body, Duration::ZERO)
  }

  pub fn slow_body(mut self, url: &str, body: &str, delay: Duration) -> Self {
    self.responses.insert(
      url.to_owned(),
      Scripted::Body { body: body.to_owned(), delay },
    );
    self
  }

  pub fn redirect(mut self, url: &str, to: &str) -> Self {
    self
      .responses
      .insert(url.to_owned(), Scripted::Redirect(to.to_owned()));
    self
  }

  pub fn attempts(&self) -> Vec<String> { self.attempts.lock().unwrap().clone() }

  fn record(&self, url: &str) { self.attempts.lock().unwrap().push(url.to_owned()); }
}

impl Fetcher for ScriptedFetcher {
  async fn get_text(&self, url: &str, _timeout: Duration) -> Result<String> {
    self.record(url);
    match self.responses.get(url) {
      Some(Scripted::Body { body, delay }) => {
        if !delay.is_zero() {
          tokio::time::sleep(*delay).await;
        }
        Ok(body.clone())
      }
      _ => Err(Error::Unreachable(url.to_owned())),
    }
  }

  async fn final_url(&self, url: &str, _timeout: Duration) -> Result<String> {
    self.record(url);
    match self.responses.get(url) {
      Some(Scripted::Redirect(to)) => Ok(to.clone()),
      Some(Scripted::Body { .. }) => Ok(url.to_owned()),
      None => Err(Error::Unreachable(url.to_owned())),
    }
  }
}

#[derive(Default)]
pub struct FakeInterfaces(pub Vec<InterfaceAddr>);

impl FakeInterfaces {
  pub fn with(mut self, name: &str, ip: &str) -> Self {
    self.0.push(InterfaceAddr::new(name, ip.parse().unwrap()));
    self
  }
}

impl InterfaceSource for FakeInterfaces {
  fn addresses(&self) -> Vec<InterfaceAddr> { self.0.clone() }
}

pub struct FakeProbe(pub bool);

impl Ipv6Probe for FakeProbe {
  async fn supports_ipv6(&self) -> bool { self.0 }
}
