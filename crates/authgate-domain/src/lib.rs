//! authgate-domain: Core authorization domain logic
//!
//! This crate contains the domain-level building blocks of the enforcement
//! layer:
//! - Access-request tuple type and the external engine/session contracts
//! - Path-segment wildcard matcher for rule patterns
//! - TTL'd decision cache with per-identity invalidation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               authgate-domain               │
//! ├─────────────────────────────────────────────┤
//! │  request.rs - Request tuple & trait seams   │
//! │  matcher.rs - Path wildcard matching        │
//! │  cache.rs   - Decision caching              │
//! │  error.rs   - Error taxonomy                │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod matcher;
pub mod request;

// Re-export commonly used types at the crate root
pub use cache::{CacheKey, DecisionCache, DecisionCacheConfig};
pub use error::{DomainError, DomainResult};
pub use request::{AccessRequest, Claims, ClaimsVerifier, PolicyEngine};
