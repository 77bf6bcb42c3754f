//! Local network-interface enumeration, the last resort when every echo
//! service fails.

use std::net::IpAddr;

use depot_core::address::strip_zone;

/// Interfaces whose addresses win over any other.
pub const PREFERRED_INTERFACES: [&str; 3] = ["en0", "en1", "pdp_ip0"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
  pub name: String,
  pub ip:   IpAddr,
}

impl InterfaceAddr {
  pub fn new(name: impl Into<String>, ip: IpAddr) -> Self {
    Self { name: name.into(), ip }
  }
}

pub trait InterfaceSource: Send + Sync {
  /// Every address bound to every interface, in enumeration order.
  fn addresses(&self) -> Vec<InterfaceAddr>;
}

/// [`InterfaceSource`] reading the host's interfaces via `if-addrs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
  fn addresses(&self) -> Vec<InterfaceAddr> {
    match if_addrs::get_if_addrs() {
      Ok(list) => list
        .into_iter()
        .map(|iface| InterfaceAddr::new(iface.name.clone(), iface.ip()))
        .collect(),
      Err(e) => {
        tracing::warn!(error = %e, "failed to enumerate network interfaces");
        Vec::new()
      }
    }
  }
}

fn is_preferred(name: &str) -> bool { PREFERRED_INTERFACES.contains(&name) }

/// Pick the best IPv4 address.
///
/// A preferred interface always wins (the last one seen). Otherwise the first
/// address that is neither loopback nor link-local (`169.254.`) is used.
pub fn pick_ipv4(addrs: &[InterfaceAddr]) -> Option<String> {
  let mut chosen = None;
  for addr in addrs {
    let IpAddr::V4(ip) = addr.ip else { continue };
    let text = ip.to_string();
    if is_preferred(&addr.name) {
      chosen = Some(text);
    } else if chosen.is_none() && !ip.is_loopback() && !text.starts_with("169.254.") {
      chosen = Some(text);
    }
  }
  chosen
}

/// Pick the best IPv6 address.
///
/// Global unicast (`2…`/`3…`) wins, and one on a preferred interface ends the
/// search. Failing that, whichever unique-local (`fd…`) or link-local
/// (`fe80:`, zone stripped) address is seen first.
pub fn pick_ipv6(addrs: &[InterfaceAddr]) -> Option<String> {
  let mut chosen: Option<String> = None;
  for addr in addrs {
    let IpAddr::V6(ip) = addr.ip else { continue };
    let text = ip.to_string();
    if text.starts_with('2') || text.starts_with('3') {
      chosen = Some(text);
      if is_preferred(&addr.name) {
        break;
      }
    } else if chosen.is_none() && text.starts_with("fd") {
      chosen = Some(text);
    } else if chosen.is_none() && text.starts_with("fe80:") {
      chosen = Some(strip_zone(&text).to_owned());
    }
  }
  chosen
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr(name: &str, ip: &str) -> InterfaceAddr {
    InterfaceAddr::new(name, ip.parse().unwrap())
  }

  #[test]
  fn ipv4_skips_loopback_and_link_local() {
    let addrs = [
      addr("lo0", "127.0.0.1"),
      addr("bridge0", "169.254.3.3"),
      addr("utun2", "10.8.0.2"),
    ];
    assert_eq!(pick_ipv4(&addrs).as_deref(), Some("10.8.0.2"));
  }

  #[test]
  fn ipv4_preferred_interface_overrides_earlier_pick() {
    let addrs = [
      addr("utun2", "10.8.0.2"),
      addr("en0", "192.168.1.5"),
      addr("utun3", "10.9.0.2"),
    ];
    assert_eq!(pick_ipv4(&addrs).as_deref(), Some("192.168.1.5"));
  }

  #[test]
  fn ipv4_none_when_only_loopback() {
    assert_eq!(pick_ipv4(&[addr("lo0", "127.0.0.1")]), None);
  }

  #[test]
  fn ipv6_prefers_global_over_unique_and_link_local() {
    let addrs = [
      addr("en0", "fe80::1"),
      addr("en0", "fd12::7"),
      addr("utun1", "2001:db8::9"),
    ];
    assert_eq!(pick_ipv6(&addrs).as_deref(), Some("2001:db8::9"));
  }

  #[test]
  fn ipv6_global_on_preferred_interface_stops_search() {
    let addrs = [
      addr("en0", "2001:db8::1"),
      addr("utun1", "2001:db8::2"),
    ];
    assert_eq!(pick_ipv6(&addrs).as_deref(), Some("2001:db8::1"));
  }

  #[test]
  fn ipv6_falls_back_to_first_unique_or_link_local() {
    let addrs = [addr("en0", "fe80::1"), addr("en0", "fd12::7")];
    assert_eq!(pick_ipv6(&addrs).as_deref(), Some("fe80::1"));

    let addrs = [addr("en0", "fd12::7"), addr("en0", "fe80::1")];
    assert_eq!(pick_ipv6(&addrs).as_deref(), Some("fd12::7"));

    assert_eq!(pick_ipv6(&[addr("lo0", "::1")]), None);
  }
}
