//! Single-decision enforcement and cache invalidation.
//!
//! The [`Enforcer`] wraps an external policy engine with:
//! - identity normalization from verified token claims
//! - deny-by-default on any identity-resolution failure
//! - containment of engine faults (a misbehaving engine denies, never
//!   crashes the request path)
//! - a write-through decision cache and per-identity lock table used by
//!   the batch path in [`crate::batch`]

use std::sync::Arc;

use tracing::{debug, warn};

use authgate_domain::{AccessRequest, ClaimsVerifier, DecisionCache, DomainError, DomainResult, PolicyEngine};

use crate::config::{BatchSettings, EnforcerConfig};
use crate::lock::IdentityLocks;

/// Identity substituted when claims indicate a superuser login without an
/// email of its own.
const ADMIN_IDENTITY: &str = "admin";

/// Enforcement layer over an external policy engine.
///
/// All collaborators are injected at construction; tests substitute fresh
/// instances per case.
pub struct Enforcer {
    pub(crate) engine: Arc<dyn PolicyEngine>,
    verifier: Arc<dyn ClaimsVerifier>,
    pub(crate) cache: DecisionCache,
    pub(crate) locks: IdentityLocks,
    pub(crate) batch: BatchSettings,
}

impl std::fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enforcer")
            .field("cache", &self.cache)
            .field("batch", &self.batch)
            .finish()
    }
}

impl Enforcer {
    /// Creates a new enforcer from its collaborators and configuration.
    pub fn new(
        engine: Arc<dyn PolicyEngine>,
        verifier: Arc<dyn ClaimsVerifier>,
        config: &EnforcerConfig,
    ) -> Self {
        Self {
            engine,
            verifier,
            cache: DecisionCache::new(config.cache_config()),
            locks: IdentityLocks::new(),
            batch: config.batch.clone(),
        }
    }

    /// Evaluates one decision for a raw credential token.
    ///
    /// The token is verified and its claims reduced to a normalized
    /// (lower-cased) identity before delegation. Any failure to verify or
    /// extract claims yields `false`; this operation never errors toward
    /// the caller.
    pub async fn enforce(
        &self,
        token: &str,
        resource: &str,
        action: &str,
        item: Option<&str>,
    ) -> bool {
        let identity = match self.resolve_identity(token) {
            Ok(identity) => identity,
            Err(error) => {
                debug!(%error, "identity resolution failed, denying");
                return false;
            }
        };
        self.enforce_for_identity(&identity, resource, action, item)
            .await
    }

    /// Evaluates one decision for an already-resolved identity.
    ///
    /// Arguments are forwarded verbatim: no normalization and no
    /// deny-by-default wrapper. Malformed input surfaces as an
    /// engine-level `false` rather than a distinguishable error.
    pub async fn enforce_for_identity(
        &self,
        identity: &str,
        resource: &str,
        action: &str,
        item: Option<&str>,
    ) -> bool {
        let request = match AccessRequest::new(identity, resource, action) {
            Ok(request) => request,
            Err(_) => return false,
        };
        let request = match item {
            Some(item) => request.with_item(item),
            None => request,
        };

        // Recoverable-fault boundary: an internal engine failure is
        // contained here as a denial.
        match self.engine.evaluate(&request).await {
            Ok(allowed) => allowed,
            Err(error) => {
                warn!(%error, subject = %request.subject, "policy engine fault, denying");
                false
            }
        }
    }

    /// Like [`Self::enforce`], but converts a denial into an explicit
    /// [`DomainError::PermissionDenied`] carrying a summary of the
    /// requested resource and action.
    pub async fn require(
        &self,
        token: &str,
        resource: &str,
        action: &str,
        item: Option<&str>,
    ) -> DomainResult<()> {
        if self.enforce(token, resource, action, item).await {
            return Ok(());
        }
        let details = match item {
            Some(item) => format!("{resource}, {action}, {item}"),
            None => format!("{resource}, {action}"),
        };
        Err(DomainError::PermissionDenied { details })
    }

    /// Drops all cached decisions for one identity.
    ///
    /// Serialized against that identity's in-flight batch passes by the
    /// lock table. Returns `false` when caching is disabled.
    pub async fn invalidate(&self, identity: &str) -> bool {
        let identity = identity.to_lowercase();
        let _guard = self.locks.acquire(&identity).await;
        self.cache.invalidate_identity(&identity).await
    }

    /// Flushes the entire decision cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Reduces verified claims to the normalized identity.
    ///
    /// The `email` claim is the identity; a superuser login (`sub` of
    /// `admin` or `admin:login`) without an email falls back to the fixed
    /// administrative identity.
    fn resolve_identity(&self, token: &str) -> DomainResult<String> {
        let claims = self.verifier.verify(token)?;
        let email = claims.get("email").unwrap_or_default();
        let sub = claims.get("sub").unwrap_or_default();

        let identity = if email.is_empty() && (sub == "admin" || sub == "admin:login") {
            ADMIN_IDENTITY
        } else {
            email
        };
        Ok(identity.to_lowercase())
    }
}
