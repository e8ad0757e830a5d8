//! Access-request tuple and the contracts consumed from external collaborators.
//!
//! The policy engine and the identity/session layer live outside this
//! workspace; they are consumed through the [`PolicyEngine`] and
//! [`ClaimsVerifier`] traits so tests can substitute in-memory
//! implementations.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{DomainError, DomainResult};

/// A single authorization question posed to the policy engine.
///
/// Replaces loose variadic argument lists with an explicit tuple validated
/// at construction: a request with an empty subject, resource, or action
/// fails fast instead of failing inside the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// The normalized identity asking for access.
    pub subject: String,
    /// The resource being accessed (e.g., "app").
    pub resource: String,
    /// The action being performed (e.g., "view").
    pub action: String,
    /// Optional per-item qualifier for batch checks (e.g., an object path).
    pub item: Option<String>,
}

impl AccessRequest {
    /// Creates a new access request, rejecting empty components.
    pub fn new(
        subject: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> DomainResult<Self> {
        let subject = subject.into();
        let resource = resource.into();
        let action = action.into();

        for (name, value) in [
            ("subject", &subject),
            ("resource", &resource),
            ("action", &action),
        ] {
            if value.is_empty() {
                return Err(DomainError::InvalidRequest {
                    message: format!("{name} cannot be empty"),
                });
            }
        }

        Ok(Self {
            subject,
            resource,
            action,
            item: None,
        })
    }

    /// Attaches the per-item qualifier.
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }
}

/// Verified claims extracted from a credential token.
#[derive(Debug, Clone, Default)]
pub struct Claims {
    fields: HashMap<String, String>,
}

impl Claims {
    /// Builds a claims set from field pairs.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of a claims field, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// The rule-evaluation contract consumed from the external policy engine.
///
/// Internal engine faults surface as [`DomainError::Engine`]; callers on
/// boolean paths contain them as denials so a misbehaving engine can never
/// crash the request path.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    /// Evaluates a single request against the loaded policy model.
    async fn evaluate(&self, request: &AccessRequest) -> DomainResult<bool>;
}

/// The session contract consumed from the identity layer.
pub trait ClaimsVerifier: Send + Sync {
    /// Verifies a raw credential token and returns its claims.
    fn verify(&self, token: &str) -> DomainResult<Claims>;
}
