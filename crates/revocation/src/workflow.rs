//! Suspension workflow: revoke a suspended user's access everywhere at once.
//!
//! ## Design
//!
//! - One spawned task per application, each wrapping exactly one client call
//! - Every call runs under the configured timeout; elapsing yields a
//!   `"timeout"` failure for that application only
//! - The workflow waits for all tasks (no short-circuit on failure), then
//!   builds the report from the task results in input order
//! - Tasks are detached if the caller goes away, so in-flight revocations
//!   still complete in the background
//!
//! The suspension itself must already be stored before this runs. Nothing
//! here writes to the account store, and nothing is retried implicitly.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, warn, Instrument};

use signon_accounts::{Application, User};
use signon_core::{ApplicationId, UserId};

use crate::{RetryPolicy, RevocationClient, RevocationConfig, RevocationOutcome, SuspensionReport};

/// Failure reason recorded when a revocation call exceeds the timeout.
pub const TIMEOUT_REASON: &str = "timeout";

/// Fans revocation out across the applications a suspended user used.
#[derive(Clone)]
pub struct SuspensionWorkflow {
    client: Arc<dyn RevocationClient>,
    config: RevocationConfig,
    limiter: Option<Arc<Semaphore>>,
}

impl core::fmt::Debug for SuspensionWorkflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SuspensionWorkflow")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SuspensionWorkflow {
    pub fn new<C>(client: C, config: RevocationConfig) -> Self
    where
        C: RevocationClient + 'static,
    {
        Self::from_arc(Arc::new(client), config)
    }

    pub fn from_arc(client: Arc<dyn RevocationClient>, config: RevocationConfig) -> Self {
        let limiter = config
            .max_in_flight
            .map(|max| Arc::new(Semaphore::new(max.max(1))));
        Self {
            client,
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &RevocationConfig {
        &self.config
    }

    /// Revoke `user`'s access to every application in `applications_used`.
    ///
    /// Each application is called exactly once. The returned report holds
    /// every application in exactly one partition, in input order.
    pub async fn run_suspension(
        &self,
        user: &User,
        applications_used: &[Application],
    ) -> SuspensionReport {
        let span = info_span!("suspension", user_id = %user.id);

        async {
            if !user.is_suspended() {
                debug!("revoking access for a user that is not recorded as suspended");
            }
            info!(applications = applications_used.len(), "revoking application access");

            let report = self.fan_out(user.id, applications_used).await;

            info!(
                successes = report.successes().len(),
                failures = report.failures().len(),
                "application access revocation finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    /// Re-invoke revocation once for each application that failed in `report`.
    ///
    /// Returns `report` with the retry folded in.
    pub async fn retry_failures(&self, user: &User, report: SuspensionReport) -> SuspensionReport {
        let failed = report.failed_applications();
        self.retry_round(user, report, failed).await
    }

    /// Like [`retry_failures`](Self::retry_failures), limited to the failed
    /// applications listed in `only`. Listed applications that did not fail
    /// are not called again.
    pub async fn retry_selected(
        &self,
        user: &User,
        report: SuspensionReport,
        only: &[ApplicationId],
    ) -> SuspensionReport {
        let selected = report
            .failed_applications()
            .into_iter()
            .filter(|a| only.contains(&a.id))
            .collect();
        self.retry_round(user, report, selected).await
    }

    /// Retry failed applications in rounds until none remain or `policy` is exhausted.
    pub async fn retry_failures_with(
        &self,
        user: &User,
        report: SuspensionReport,
        policy: &RetryPolicy,
    ) -> SuspensionReport {
        let mut report = report;
        let mut round = 0;

        while !report.is_complete() && policy.allows_round(round) {
            round += 1;

            let delay = policy.delay_before_round(round);
            if !delay.is_zero() {
                debug!(round, delay_ms = delay.as_millis() as u64, "waiting before retry round");
                tokio::time::sleep(delay).await;
            }

            report = self.retry_failures(user, report).await;
        }

        if !report.is_complete() {
            warn!(
                user_id = %user.id,
                rounds = round,
                failures = report.failures().len(),
                "applications still hold access after retries"
            );
        }
        report
    }

    async fn retry_round(
        &self,
        user: &User,
        report: SuspensionReport,
        applications: Vec<Application>,
    ) -> SuspensionReport {
        if applications.is_empty() {
            return report;
        }

        info!(user_id = %user.id, applications = applications.len(), "retrying failed revocations");
        let retry = self.fan_out(user.id, &applications).await;
        report.merge_retry(retry)
    }

    async fn fan_out(&self, user_id: UserId, applications: &[Application]) -> SuspensionReport {
        let handles: Vec<_> = applications
            .iter()
            .map(|application| {
                let client = Arc::clone(&self.client);
                let limiter = self.limiter.clone();
                let application = application.clone();
                let timeout = self.config.timeout;

                tokio::spawn(async move {
                    // The timeout covers the call only, not the wait for a slot.
                    let _permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.ok(),
                        None => None,
                    };
                    revoke_with_timeout(client.as_ref(), user_id, &application, timeout).await
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (handle, application) in handles.into_iter().zip(applications) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(application = %application.name, error = %e, "revocation task failed");
                    RevocationOutcome::failure(application.id, format!("revocation task failed: {e}"))
                }
            };
            outcomes.push((application.clone(), outcome));
        }

        SuspensionReport::from_outcomes(user_id, outcomes)
    }
}

async fn revoke_with_timeout(
    client: &dyn RevocationClient,
    user_id: UserId,
    application: &Application,
    timeout: Duration,
) -> RevocationOutcome {
    let outcome = match tokio::time::timeout(timeout, client.revoke(user_id, application)).await {
        Ok(outcome) => outcome,
        Err(_) => RevocationOutcome::failure(application.id, TIMEOUT_REASON),
    };

    match &outcome {
        RevocationOutcome::Success => {
            debug!(application = %application.name, "access revoked");
        }
        RevocationOutcome::Failure { reason, .. } => {
            warn!(application = %application.name, reason = %reason, "revocation failed");
        }
    }
    outcome
}
