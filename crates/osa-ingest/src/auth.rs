//! Bearer token authentication

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// How requests without credentials are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// Every request needs a valid bearer token
    #[default]
    Enforce,
    /// Requests with no `Authorization` header are let through.
    /// A header that is present must still carry a valid token.
    PermitMissingForTesting,
}

/// Decides whether a bearer token is acceptable
pub trait TokenValidator: Send + Sync {
    /// Whether `token` (without the `Bearer ` prefix) is accepted
    fn is_valid(&self, token: &str) -> bool;
}

/// Fixed set of accepted tokens
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashSet<String>,
}

impl StaticTokens {
    #[must_use]
    pub fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenValidator for StaticTokens {
    fn is_valid(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

/// Who made an authorized request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// Presented a valid token
    Authenticated,
    /// No credentials, admitted by `PermitMissingForTesting`
    Unauthenticated,
}

/// Applies an [`AuthPolicy`] with a [`TokenValidator`]
#[derive(Clone)]
pub struct Authenticator {
    policy: AuthPolicy,
    validator: Arc<dyn TokenValidator>,
}

impl Authenticator {
    #[must_use]
    pub fn new(policy: AuthPolicy, validator: Arc<dyn TokenValidator>) -> Self {
        Self { policy, validator }
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> AuthPolicy {
        self.policy
    }

    /// Check an `Authorization` header value
    ///
    /// # Errors
    /// `IngestError::Unauthorized` if the header is absent under `Enforce`,
    /// malformed, or carries a token the validator refuses.
    pub fn authorize(&self, header: Option<&str>) -> Result<Caller, IngestError> {
        let Some(header) = header else {
            return match self.policy {
                AuthPolicy::Enforce => Err(IngestError::Unauthorized(
                    "missing bearer token".to_string(),
                )),
                AuthPolicy::PermitMissingForTesting => {
                    tracing::debug!("admitting request without credentials");
                    Ok(Caller::Unauthenticated)
                }
            };
        };

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                IngestError::Unauthorized("authorization header is not a bearer token".to_string())
            })?;

        if self.validator.is_valid(token) {
            Ok(Caller::Authenticated)
        } else {
            Err(IngestError::Unauthorized("invalid bearer token".to_string()))
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator(policy: AuthPolicy) -> Authenticator {
        Authenticator::new(policy, Arc::new(StaticTokens::new(["good"])))
    }

    #[test]
    fn enforce_rejects_missing_header() {
        let err = authenticator(AuthPolicy::Enforce).authorize(None).unwrap_err();
        assert_eq!(err.status_code().as_u16(), 401);
    }

    #[test]
    fn testing_policy_admits_missing_header_only() {
        let auth = authenticator(AuthPolicy::PermitMissingForTesting);
        assert_eq!(auth.authorize(None).unwrap(), Caller::Unauthenticated);
        assert!(auth.authorize(Some("Bearer bad")).is_err());
        assert_eq!(
            auth.authorize(Some("Bearer good")).unwrap(),
            Caller::Authenticated
        );
    }

    #[test]
    fn header_must_be_a_bearer_token() {
        let auth = authenticator(AuthPolicy::Enforce);
        assert!(auth.authorize(Some("Basic Z29vZA==")).is_err());
        assert!(auth.authorize(Some("Bearer ")).is_err());
        assert!(auth.authorize(Some("bearer good")).is_ok());
    }
}
