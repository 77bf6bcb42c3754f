//! Core types and trait definitions for the Depot office inventory.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; backends plug in through
//! [`kv::KeyValueStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod address;
pub mod achievement;
pub mod error;
pub mod kv;
pub mod redirect;
pub mod storage;

pub use error::{Error, Result};
