//! Domain error types for authorization operations.

use thiserror::Error;

/// Domain-specific errors for authorization operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request was explicitly denied by policy.
    ///
    /// Only produced by the error-returning enforcement wrapper; the
    /// boolean-returning operations report denial as `false`.
    #[error("permission denied: {details}")]
    PermissionDenied { details: String },

    /// An access request could not be constructed from its components.
    #[error("invalid access request: {message}")]
    InvalidRequest { message: String },

    /// A credential token could not be verified or its claims extracted.
    #[error("token verification failed: {message}")]
    TokenVerification { message: String },

    /// Internal fault inside the policy engine during evaluation.
    ///
    /// Contained at the evaluation boundary; boolean call paths map this
    /// to a denial rather than propagating it.
    #[error("policy engine error: {message}")]
    Engine { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
