//! authgate-enforcer: decision caching and batch evaluation over a policy engine
//!
//! This crate orchestrates the authorization core:
//! - [`Enforcer`] - single-decision and batch enforcement with a
//!   write-through decision cache
//! - [`lock::IdentityLocks`] - per-identity critical sections so only one
//!   cache-population pass runs per identity at a time
//! - [`config::EnforcerConfig`] - environment-driven settings with safe
//!   defaults
//! - [`observability`] - logging setup and metric registration
//!
//! The policy engine and session layer are injected through the
//! `authgate-domain` trait seams at construction; nothing here reaches for
//! ambient globals, so tests substitute fresh instances per case.

pub mod batch;
pub mod config;
pub mod enforcer;
pub mod lock;
pub mod observability;

pub use config::{BatchSettings, CacheSettings, EnforcerConfig};
pub use enforcer::Enforcer;
pub use lock::{IdentityLockGuard, IdentityLocks};
