//! IPv6 path probe, run before any IPv6 echo service is contacted.

use std::{future::Future, net::SocketAddr, time::Duration};

use tokio::net::UdpSocket;

use crate::{Error, Result};

pub trait Ipv6Probe: Send + Sync {
  /// Whether the host currently has a usable IPv6 route.
  fn supports_ipv6(&self) -> impl Future<Output = bool> + Send + '_;
}

/// Probes by connecting an unbound UDP socket towards a public IPv6 address.
/// `connect` on UDP only consults the routing table; no packet is sent.
#[derive(Debug, Clone)]
pub struct SystemIpv6Probe {
  target:  SocketAddr,
  timeout: Duration,
}

impl SystemIpv6Probe {
  pub fn new(target: &str, timeout: Duration) -> Result<Self> {
    let target = target
      .parse()
      .map_err(|_| Error::InvalidAddress(target.to_owned()))?;
    Ok(Self { target, timeout })
  }
}

impl Ipv6Probe for SystemIpv6Probe {
  async fn supports_ipv6(&self) -> bool {
    let attempt = async {
      let socket = UdpSocket::bind("[::]:0").await?;
      socket.connect(self.target).await?;
      Ok::<_, std::io::Error>(())
    };
    match tokio::time::timeout(self.timeout, attempt).await {
      Ok(Ok(())) => true,
      Ok(Err(e)) => {
        tracing::debug!(error = %e, "no IPv6 route");
        false
      }
      Err(_) => {
        tracing::debug!("IPv6 probe timed out");
        false
      }
    }
  }
}
