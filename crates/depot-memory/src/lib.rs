//! The user's inventory, achievements and profile, mirrored to a
//! [`KeyValueStore`](depot_core::kv::KeyValueStore).
//!
//! [`UserMemory`] is the single writer of record for the storage collections
//! and the achievement catalogue. [`ProfileStore`] owns the profile fields and
//! the profile photo on disk.

pub mod error;
pub mod memory;
pub mod profile;

pub use error::{Error, Result};
pub use memory::{GlobalStats, StorageStats, UserMemory};
pub use profile::{PhotoRef, Profile, ProfileStore, ProfileUpdate};
