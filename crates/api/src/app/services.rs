//! Service wiring: account store, application registry and the revocation workflow.
//!
//! Handlers stay thin; every state change goes through here as
//! load → execute command → save with the loaded version.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use signon_accounts::{
    AccountStore, Application, ApplicationRegistry, CreateUser, GrantPermission,
    InMemoryAccountStore, InMemoryApplicationRegistry, Permission, RevocationContract, StoreError,
    SuspendUser, UnsuspendUser, User, UserCommand,
};
use signon_core::{Aggregate, AggregateRoot, ApplicationId, DomainError, ExpectedVersion, UserId};
use signon_revocation::{SuspensionReport, SuspensionWorkflow};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the admin routes need, shared behind an `Arc`.
pub struct AppServices {
    accounts: Arc<dyn AccountStore>,
    applications: Arc<dyn ApplicationRegistry>,
    workflow: SuspensionWorkflow,
    /// Latest revocation report per suspended user.
    reports: RwLock<HashMap<UserId, SuspensionReport>>,
}

/// A new application, as submitted by an administrator.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub name: String,
    pub redirect_uri: String,
    pub bearer_token: Option<String>,
    pub supported_permissions: Vec<String>,
}

impl AppServices {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        applications: Arc<dyn ApplicationRegistry>,
        workflow: SuspensionWorkflow,
    ) -> Self {
        Self {
            accounts,
            applications,
            workflow,
            reports: RwLock::new(HashMap::new()),
        }
    }

    /// Services backed by the in-memory store and registry.
    pub fn in_memory(workflow: SuspensionWorkflow) -> Self {
        Self::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryApplicationRegistry::new()),
            workflow,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_user(&self, email: String, name: String) -> Result<User, ServiceError> {
        let user_id = UserId::new();
        let user = User::empty(user_id);
        self.execute(
            user,
            UserCommand::Create(CreateUser {
                user_id,
                email,
                name,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User, ServiceError> {
        Ok(self.accounts.get(user_id)?)
    }

    pub fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.accounts.list()?)
    }

    /// Grant `permission` on `application_id`; the application must support it.
    pub fn grant_permission(
        &self,
        user_id: UserId,
        application_id: ApplicationId,
        permission: String,
    ) -> Result<User, ServiceError> {
        let application = self.applications.get(application_id)?;
        if !application
            .supported_permission_strings()
            .iter()
            .any(|p| *p == permission)
        {
            return Err(DomainError::validation(format!(
                "{application} does not support permission {permission:?}"
            ))
            .into());
        }

        let user = self.accounts.get(user_id)?;
        self.execute(
            user,
            UserCommand::GrantPermission(GrantPermission {
                user_id,
                application_id,
                permission: Permission::new(permission),
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Record the suspension, then revoke access in every application used.
    ///
    /// Applications are resolved before anything is written, so a registry
    /// failure leaves the user untouched. Once the suspension is persisted it
    /// stands however the revocations turn out.
    pub async fn suspend_user(
        &self,
        user_id: UserId,
        reason: String,
    ) -> Result<(User, SuspensionReport), ServiceError> {
        let user = self.accounts.get(user_id)?;
        let applications = self.applications_used(&user)?;

        let user = self.execute(
            user,
            UserCommand::Suspend(SuspendUser {
                user_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;

        let report = self.workflow.run_suspension(&user, &applications).await;
        if let Err(e) = self.store_report(&report) {
            warn!(user_id = %user_id, error = %e, "revocation report not kept");
        }

        info!(
            user_id = %user_id,
            revoked = report.successes().len(),
            failed = report.failures().len(),
            "user suspended"
        );
        Ok((user, report))
    }

    pub fn unsuspend_user(&self, user_id: UserId) -> Result<User, ServiceError> {
        let user = self.accounts.get(user_id)?;
        let user = self.execute(
            user,
            UserCommand::Unsuspend(UnsuspendUser {
                user_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.forget_report(user_id)?;
        info!(user_id = %user_id, "user unsuspended");
        Ok(user)
    }

    /// The latest revocation report for a suspended user.
    pub fn suspension_report(&self, user_id: UserId) -> Result<SuspensionReport, ServiceError> {
        let user = self.accounts.get(user_id)?;
        self.report_for(&user)
    }

    /// Retry revocation for applications that failed for a suspended user.
    ///
    /// With no ids, every outstanding failure is retried in rounds under the
    /// configured policy. Otherwise each listed failure is retried once;
    /// listed applications that did not fail are left alone.
    pub async fn retry_revocation(
        &self,
        user_id: UserId,
        application_ids: &[ApplicationId],
    ) -> Result<SuspensionReport, ServiceError> {
        let user = self.accounts.get(user_id)?;
        let report = self.report_for(&user)?;

        let mut selected: Vec<ApplicationId> = Vec::with_capacity(application_ids.len());
        for id in application_ids {
            if selected.contains(id) {
                continue;
            }
            self.applications.get(*id)?;
            selected.push(*id);
        }

        let report = if selected.is_empty() {
            let policy = self.workflow.config().retry;
            self.workflow.retry_failures_with(&user, report, &policy).await
        } else {
            self.workflow.retry_selected(&user, report, &selected).await
        };

        self.store_report(&report)?;
        Ok(report)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Applications
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_application(&self, new: NewApplication) -> Result<Application, ServiceError> {
        let mut contract = RevocationContract::new(new.redirect_uri);
        if let Some(token) = new.bearer_token.filter(|t| !t.trim().is_empty()) {
            contract = contract.with_bearer_token(token);
        }

        let mut application = Application::new(ApplicationId::new(), new.name, contract)?;
        for permission in new.supported_permissions {
            if permission.trim().is_empty() {
                return Err(DomainError::validation("permission name cannot be empty").into());
            }
            application = application.with_supported_permission(Permission::new(permission));
        }

        self.applications.register(application.clone())?;
        info!(application_id = %application.id, name = %application.name, "application registered");
        Ok(application)
    }

    pub fn list_applications(&self) -> Result<Vec<Application>, ServiceError> {
        Ok(self.applications.list()?)
    }

    /// Remove an application and every grant held on it.
    ///
    /// Returns the removed application and how many users lost a grant.
    pub fn remove_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<(Application, usize), ServiceError> {
        let application = self.applications.remove(application_id)?;
        let affected = self.accounts.remove_grants_for(application_id)?;
        info!(application_id = %application_id, affected, "application removed");
        Ok((application, affected))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&self, mut user: User, command: UserCommand) -> Result<User, ServiceError> {
        let expected = ExpectedVersion::Exact(user.version());
        let events = user.execute(&command)?;
        if !events.is_empty() {
            self.accounts.save(user.clone(), expected)?;
        }
        Ok(user)
    }

    fn report_for(&self, user: &User) -> Result<SuspensionReport, ServiceError> {
        if !user.is_suspended() {
            return Err(DomainError::invariant("user is not suspended").into());
        }
        self.stored_report(user.id)?
            .ok_or(ServiceError::Store(StoreError::NotFound))
    }

    fn stored_report(&self, user_id: UserId) -> Result<Option<SuspensionReport>, ServiceError> {
        let reports = self.reports.read().map_err(|_| lock_poisoned())?;
        Ok(reports.get(&user_id).cloned())
    }

    fn store_report(&self, report: &SuspensionReport) -> Result<(), ServiceError> {
        let mut reports = self.reports.write().map_err(|_| lock_poisoned())?;
        reports.insert(report.user_id, report.clone());
        Ok(())
    }

    fn forget_report(&self, user_id: UserId) -> Result<(), ServiceError> {
        let mut reports = self.reports.write().map_err(|_| lock_poisoned())?;
        reports.remove(&user_id);
        Ok(())
    }

    /// Resolve the user's grants against the registry, skipping applications
    /// that no longer exist.
    fn applications_used(&self, user: &User) -> Result<Vec<Application>, ServiceError> {
        let mut applications = Vec::new();
        for id in user.applications_used() {
            match self.applications.get(id) {
                Ok(application) => applications.push(application),
                Err(StoreError::NotFound) => {
                    warn!(user_id = %user.id, application_id = %id, "granted application is not registered; skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(applications)
    }
}

fn lock_poisoned() -> ServiceError {
    ServiceError::Store(StoreError::Unavailable("lock poisoned".to_string()))
}
