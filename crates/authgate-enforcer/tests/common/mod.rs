//! Shared mock collaborators for enforcer integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use authgate_domain::{
    matcher, AccessRequest, Claims, ClaimsVerifier, DomainError, DomainResult, PolicyEngine,
};

/// One allow rule for the static engine. The item pattern goes through the
/// wildcard matcher, the way a real engine invokes the registered
/// predicate from its rule expressions.
pub struct Rule {
    pub subject: String,
    pub resource: String,
    pub action: String,
    pub item_pattern: String,
}

/// In-memory policy engine over a fixed rule list.
///
/// Counts evaluations and tracks the peak number of concurrently active
/// evaluations so tests can assert on worker dispatch and lock
/// exclusivity. An optional per-evaluation delay widens race windows.
#[derive(Default)]
pub struct StaticPolicyEngine {
    rules: Vec<Rule>,
    delay: Option<Duration>,
    evaluations: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl StaticPolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an allow rule; `subject` may be `*` to match any subject.
    pub fn with_rule(
        mut self,
        subject: &str,
        resource: &str,
        action: &str,
        item_pattern: &str,
    ) -> Self {
        self.rules.push(Rule {
            subject: subject.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            item_pattern: item_pattern.to_string(),
        });
        self
    }

    /// Adds a fixed delay to every evaluation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total evaluations performed so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    /// Peak number of evaluations in flight at the same time.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn allowed(&self, request: &AccessRequest) -> bool {
        self.rules.iter().any(|rule| {
            let subject_ok = rule.subject == "*" || rule.subject == request.subject;
            let scope_ok = rule.resource == request.resource && rule.action == request.action;
            let item_ok = match &request.item {
                Some(item) => matcher::matches(item, &rule.item_pattern),
                None => rule.item_pattern == "*",
            };
            subject_ok && scope_ok && item_ok
        })
    }
}

#[async_trait]
impl PolicyEngine for StaticPolicyEngine {
    async fn evaluate(&self, request: &AccessRequest) -> DomainResult<bool> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let allowed = self.allowed(request);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(allowed)
    }
}

/// Engine that fails every evaluation, for fault-containment tests.
pub struct FailingEngine;

#[async_trait]
impl PolicyEngine for FailingEngine {
    async fn evaluate(&self, _request: &AccessRequest) -> DomainResult<bool> {
        Err(DomainError::Engine {
            message: "rule index corrupted".to_string(),
        })
    }
}

/// Map-backed claims verifier: known tokens yield their claims, anything
/// else fails verification.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, Vec<(String, String)>>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, fields: &[(&str, &str)]) -> Self {
        self.tokens.insert(
            token.to_string(),
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }
}

impl ClaimsVerifier for StaticVerifier {
    fn verify(&self, token: &str) -> DomainResult<Claims> {
        match self.tokens.get(token) {
            Some(fields) => Ok(Claims::from_fields(fields.clone())),
            None => Err(DomainError::TokenVerification {
                message: "unknown token".to_string(),
            }),
        }
    }
}
