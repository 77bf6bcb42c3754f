//! Address validity predicates for the network identity cache.

use std::net::Ipv4Addr;

/// Strict dotted-quad: four decimal octets in `0..=255`, no leading zeros.
pub fn is_valid_ipv4(s: &str) -> bool { s.parse::<Ipv4Addr>().is_ok() }

/// Loose colon-hex check applied to echo-service responses.
///
/// After dropping any `%zone` suffix the string must contain a colon, consist
/// only of hex digits and colons, have at most seven colons and no `:::`.
pub fn is_valid_ipv6(s: &str) -> bool {
  let s = strip_zone(s);
  s.contains(':')
    && s.chars().all(|c| c == ':' || c.is_ascii_hexdigit())
    && s.matches(':').count() <= 7
    && !s.contains(":::")
}

/// Drop a `%zone` suffix, e.g. `fe80::1%en0` → `fe80::1`.
pub fn strip_zone(s: &str) -> &str {
  s.split_once('%').map_or(s, |(addr, _)| addr)
}

pub fn is_link_local_v6(s: &str) -> bool {
  s.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("fe80:"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ipv4_accepts_every_octet_in_range() {
    for octet in 0..=255u16 {
      let addr = format!("{octet}.{octet}.0.{octet}");
      assert!(is_valid_ipv4(&addr), "{addr}");
    }
  }

  #[test]
  fn ipv4_rejects_out_of_range_and_bad_separators() {
    for bad in [
      "256.1.1.1",
      "1.1.1.300",
      "1.1.1",
      "1.1.1.1.1",
      "1..1.1",
      "1,1,1,1",
      "1.1.1.1 ",
      "a.b.c.d",
      "01.1.1.1",
      "",
    ] {
      assert!(!is_valid_ipv4(bad), "{bad:?}");
    }
  }

  #[test]
  fn ipv6_accepts_colon_hex_forms() {
    for good in [
      "2001:db8::1",
      "2001:0db8:85a3:0000:0000:8a2e:0370:7334",
      "::1",
      "fe80::1%en0",
      "FD00::ABCD",
    ] {
      assert!(is_valid_ipv6(good), "{good}");
    }
  }

  #[test]
  fn ipv6_rejects_each_violation() {
    // No colon.
    assert!(!is_valid_ipv6("20010db8"));
    // Non-hex character.
    assert!(!is_valid_ipv6("2001:db8::g"));
    assert!(!is_valid_ipv6("::ffff:1.2.3.4"));
    // Eight colons.
    assert!(!is_valid_ipv6("1:2:3:4:5:6:7:8:9"));
    // Triple colon.
    assert!(!is_valid_ipv6("2001:::1"));
  }

  #[test]
  fn zone_is_stripped() {
    assert_eq!(strip_zone("fe80::1%en0"), "fe80::1");
    assert_eq!(strip_zone("2001:db8::1"), "2001:db8::1");
    assert!(is_link_local_v6("fe80::1"));
    assert!(!is_link_local_v6("fd00::1"));
  }
}
