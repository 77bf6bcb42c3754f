//! The composition root: every long-lived service, built once per run and
//! handed to commands by reference.

use std::sync::Arc;

use anyhow::Context as _;
use depot_core::kv::Preferences;
use depot_memory::{ProfileStore, UserMemory};
use depot_net::{
  NetConfig,
  fetch::HttpFetcher,
  interfaces::SystemInterfaces,
  probe::SystemIpv6Probe,
  redirect::{LaunchGuard, RedirectFlow},
  resolve::IpResolver,
};
use depot_store_sqlite::SqliteStore;

use crate::settings::Settings;

pub type Resolver = IpResolver<SqliteStore, HttpFetcher, SystemInterfaces, SystemIpv6Probe>;

pub struct Services {
  pub settings: Settings,
  pub prefs:    Preferences<SqliteStore>,
  pub fetcher:  HttpFetcher,
  guard:        Arc<LaunchGuard>,
}

impl Services {
  pub async fn open(settings: Settings) -> anyhow::Result<Self> {
    if let Some(parent) = settings.store_path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let store = SqliteStore::open(&settings.store_path)
      .await
      .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

    Ok(Self {
      prefs: Preferences::new(Arc::new(store)),
      fetcher: HttpFetcher::new().context("failed to build HTTP client")?,
      guard: LaunchGuard::new(),
      settings,
    })
  }

  pub fn net(&self) -> &NetConfig { &self.settings.net }

  pub async fn memory(&self) -> anyhow::Result<UserMemory<SqliteStore>> {
    UserMemory::load(self.prefs.clone())
      .await
      .context("failed to load user memory")
  }

  pub fn profiles(&self) -> ProfileStore<SqliteStore> {
    ProfileStore::new(self.prefs.clone(), &self.settings.photo_dir)
  }

  pub fn resolver(&self) -> anyhow::Result<Resolver> {
    let net = self.net();
    let probe = SystemIpv6Probe::new(&net.ipv6_probe_target, net.ipv6_probe_timeout())
      .context("invalid IPv6 probe target")?;
    Ok(IpResolver::new(
      self.prefs.clone(),
      self.fetcher.clone(),
      SystemInterfaces,
      probe,
      net.clone(),
    ))
  }

  pub fn redirect_flow(&self) -> RedirectFlow<SqliteStore> {
    RedirectFlow::new(
      self.prefs.clone(),
      Arc::clone(&self.guard),
      self.net().clone(),
    )
  }
}
