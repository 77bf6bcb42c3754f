//! Network identity, readiness and redirect handling for Depot.
//!
//! - [`resolve`]: best-effort public IPv4/IPv6 discovery over a fixed chain
//!   of echo services, with local-interface fallback.
//! - [`check`]: device token storage and the server check URL.
//! - [`readiness`]: joins notification permission and IP resolution.
//! - [`redirect`]: the one-time server-directed redirect state machine.
//!
//! Every external effect sits behind a trait ([`fetch::Fetcher`],
//! [`interfaces::InterfaceSource`], [`probe::Ipv6Probe`],
//! [`readiness::PermissionPrompt`]) so the flows can be driven by fakes.

#![allow(async_fn_in_trait)]

pub mod check;
pub mod config;
pub mod error;
pub mod fetch;
pub mod interfaces;
pub mod probe;
pub mod readiness;
pub mod redirect;
pub mod resolve;

pub use config::NetConfig;
pub use error::{Error, Result};

#[cfg(test)]
mod testing;
