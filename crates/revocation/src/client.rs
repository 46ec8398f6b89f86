//! The revocation capability every application integration provides.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use signon_accounts::Application;
use signon_core::{ApplicationId, UserId};

/// Result of revoking one user's access to one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RevocationOutcome {
    Success,
    Failure {
        application: ApplicationId,
        reason: String,
    },
}

impl RevocationOutcome {
    pub fn failure(application: ApplicationId, reason: impl Into<String>) -> Self {
        Self::Failure {
            application,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RevocationOutcome::Success)
    }
}

/// Tells one application that a user's access must be dropped.
///
/// Implementations make at most one outbound call per invocation and never
/// touch the account store. Every failure (network, timeout, rejected
/// request, unusable contract) is returned as [`RevocationOutcome::Failure`].
/// An application that has nothing to revoke for the user reports `Success`,
/// which makes repeated revocation safe.
#[async_trait]
pub trait RevocationClient: Send + Sync {
    async fn revoke(&self, user_id: UserId, application: &Application) -> RevocationOutcome;
}

#[async_trait]
impl<C> RevocationClient for Arc<C>
where
    C: RevocationClient + ?Sized,
{
    async fn revoke(&self, user_id: UserId, application: &Application) -> RevocationOutcome {
        (**self).revoke(user_id, application).await
    }
}
