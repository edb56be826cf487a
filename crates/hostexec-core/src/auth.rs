//! Endpoint access control.
//!
//! Every execution is checked by an [`Authorizer`] before a runtime client is
//! created. There is no implicit bypass: running without checks requires
//! choosing [`AllowAll`] explicitly.

use crate::error::{ExecError, Result};
use async_trait::async_trait;
use hostexec_runtime::{Endpoint, EndpointId};
use std::collections::{BTreeSet, HashMap};

/// Identity of the caller requesting an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// No credentials were presented.
    Anonymous,
    /// Bearer token credentials.
    Token(String),
}

/// Decides whether a principal may execute scripts on an endpoint.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Authorize `principal` to execute on `endpoint`.
    ///
    /// # Errors
    /// `ExecError::AccessDenied` carrying the reason for the denial.
    async fn authorize(&self, principal: &Principal, endpoint: &Endpoint) -> Result<()>;
}

/// Grants every principal access to every endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _principal: &Principal, _endpoint: &Endpoint) -> Result<()> {
        Ok(())
    }
}

/// Endpoints a token may execute on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointScope {
    /// Every endpoint.
    All,
    /// Only the listed endpoints.
    Only(BTreeSet<EndpointId>),
}

impl EndpointScope {
    fn contains(&self, id: EndpointId) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(&id),
        }
    }
}

/// Static bearer-token access list. Anonymous principals are always denied.
#[derive(Debug, Clone, Default)]
pub struct TokenAuthorizer {
    grants: HashMap<String, EndpointScope>,
}

impl TokenAuthorizer {
    /// Create an authorizer that denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `token` to execute on `endpoint`.
    pub fn grant(mut self, token: impl Into<String>, endpoint: EndpointId) -> Self {
        let scope = self
            .grants
            .entry(token.into())
            .or_insert_with(|| EndpointScope::Only(BTreeSet::new()));
        if let EndpointScope::Only(ids) = scope {
            ids.insert(endpoint);
        }
        self
    }

    /// Allow `token` to execute on every endpoint.
    pub fn grant_all(mut self, token: impl Into<String>) -> Self {
        self.grants.insert(token.into(), EndpointScope::All);
        self
    }

    /// Number of tokens with at least one grant.
    pub fn token_count(&self) -> usize {
        self.grants.len()
    }
}

#[async_trait]
impl Authorizer for TokenAuthorizer {
    async fn authorize(&self, principal: &Principal, endpoint: &Endpoint) -> Result<()> {
        let denied = |reason: &str| Err(ExecError::access_denied(endpoint.id, reason));
        let Principal::Token(token) = principal else {
            return denied("no credentials presented");
        };
        match self.grants.get(token) {
            None => denied("unknown token"),
            Some(scope) if !scope.contains(endpoint.id) => {
                denied("token is not granted on this endpoint")
            }
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(id: u64) -> Endpoint {
        Endpoint::new(id, format!("ep-{id}"), "local")
    }

    fn denial_reason(result: Result<()>) -> String {
        match result {
            Err(ExecError::AccessDenied { reason, .. }) => reason,
            other => panic!("expected access denied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_allow_all() {
        assert!(AllowAll
            .authorize(&Principal::Anonymous, &endpoint(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_token_scopes() {
        let auth = TokenAuthorizer::new()
            .grant("ops", EndpointId::new(1))
            .grant("ops", EndpointId::new(2))
            .grant_all("admin");
        assert_eq!(auth.token_count(), 2);

        let ops = Principal::Token("ops".into());
        let admin = Principal::Token("admin".into());
        let stranger = Principal::Token("nope".into());

        assert!(auth.authorize(&ops, &endpoint(1)).await.is_ok());
        assert!(auth.authorize(&ops, &endpoint(2)).await.is_ok());
        assert!(auth.authorize(&admin, &endpoint(3)).await.is_ok());

        let reason = denial_reason(auth.authorize(&ops, &endpoint(3)).await);
        assert_eq!(reason, "token is not granted on this endpoint");
        let reason = denial_reason(auth.authorize(&stranger, &endpoint(1)).await);
        assert_eq!(reason, "unknown token");
    }

    #[tokio::test]
    async fn test_anonymous_denied() {
        let auth = TokenAuthorizer::new().grant_all("admin");
        let err = auth
            .authorize(&Principal::Anonymous, &endpoint(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::AccessDenied { endpoint, .. } if endpoint == EndpointId::new(1)));
        assert!(err.to_string().contains("no credentials presented"));
    }

    #[tokio::test]
    async fn test_grant_all_wins_over_later_grant() {
        let auth = TokenAuthorizer::new()
            .grant_all("admin")
            .grant("admin", EndpointId::new(1));
        let admin = Principal::Token("admin".into());
        assert!(auth.authorize(&admin, &endpoint(42)).await.is_ok());
    }
}
