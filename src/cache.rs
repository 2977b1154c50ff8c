//! Cache subsystem
//!
//! Components:
//! - `ttl_cache`: generic in-memory store with per-entry expiry.
//! - `ctrl_cache`: the `CtrlCache` trait keyed by entrypoint, cluster and
//!   infobase scopes, with its in-memory implementation.

pub mod ctrl_cache;
pub mod ttl_cache;

pub use ctrl_cache::{CtrlCache, MemoryCtrlCache};
pub use ttl_cache::TtlCache;
