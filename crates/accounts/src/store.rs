//! Account Store and Application Registry contracts.
//!
//! The suspension workflow only needs a narrow read/write surface: load a user,
//! persist a user with an optimistic-concurrency expectation, and list the
//! applications that user is recorded as using.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use signon_core::{Aggregate, ApplicationId, DomainError, ExpectedVersion, UserId};

use crate::user::{RemoveApplicationGrants, UserCommand};
use crate::{Application, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for user accounts.
pub trait AccountStore: Send + Sync {
    fn get(&self, user_id: UserId) -> Result<User, StoreError>;

    /// Persist `user`. `expected` is checked against the version currently stored
    /// (0 when the user does not exist yet).
    fn save(&self, user: User, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<User>, StoreError>;

    /// Applications the user is recorded as using, in first-grant order.
    fn applications_used(&self, user_id: UserId) -> Result<Vec<ApplicationId>, StoreError> {
        Ok(self.get(user_id)?.applications_used())
    }

    /// Drop every user's grant on `application_id`. Returns how many users changed.
    fn remove_grants_for(&self, application_id: ApplicationId) -> Result<usize, StoreError>;
}

/// Registered external applications.
pub trait ApplicationRegistry: Send + Sync {
    fn get(&self, id: ApplicationId) -> Result<Application, StoreError>;
    fn register(&self, application: Application) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<Application>, StoreError>;
    fn remove(&self, id: ApplicationId) -> Result<Application, StoreError>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn get(&self, user_id: UserId) -> Result<User, StoreError> {
        (**self).get(user_id)
    }

    fn save(&self, user: User, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(user, expected)
    }

    fn list(&self) -> Result<Vec<User>, StoreError> {
        (**self).list()
    }

    fn applications_used(&self, user_id: UserId) -> Result<Vec<ApplicationId>, StoreError> {
        (**self).applications_used(user_id)
    }

    fn remove_grants_for(&self, application_id: ApplicationId) -> Result<usize, StoreError> {
        (**self).remove_grants_for(application_id)
    }
}

impl<S> ApplicationRegistry for Arc<S>
where
    S: ApplicationRegistry + ?Sized,
{
    fn get(&self, id: ApplicationId) -> Result<Application, StoreError> {
        (**self).get(id)
    }

    fn register(&self, application: Application) -> Result<(), StoreError> {
        (**self).register(application)
    }

    fn list(&self) -> Result<Vec<Application>, StoreError> {
        (**self).list()
    }

    fn remove(&self, id: ApplicationId) -> Result<Application, StoreError> {
        (**self).remove(id)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory implementations
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get(&self, user_id: UserId) -> Result<User, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        users.get(&user_id).cloned().ok_or(StoreError::NotFound)
    }

    fn save(&self, user: User, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;

        let current = users.get(&user.id).map(|u| u.version).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        users.insert(user.id, user);
        Ok(())
    }

    fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    fn remove_grants_for(&self, application_id: ApplicationId) -> Result<usize, StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;

        let mut changed = 0;
        for user in users.values_mut().filter(|u| u.created) {
            let cmd = UserCommand::RemoveApplicationGrants(RemoveApplicationGrants {
                user_id: user.id,
                application_id,
                occurred_at: Utc::now(),
            });
            if !user.execute(&cmd)?.is_empty() {
                changed += 1;
            }
        }

        debug!(application_id = %application_id, users = changed, "removed application grants");
        Ok(changed)
    }
}

/// In-memory application registry for tests/dev.
///
/// Keeps registration order so listings are stable.
#[derive(Debug, Default)]
pub struct InMemoryApplicationRegistry {
    applications: RwLock<Vec<Application>>,
}

impl InMemoryApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApplicationRegistry for InMemoryApplicationRegistry {
    fn get(&self, id: ApplicationId) -> Result<Application, StoreError> {
        let apps = self.applications.read().map_err(|_| poisoned())?;
        apps.iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn register(&self, application: Application) -> Result<(), StoreError> {
        let mut apps = self.applications.write().map_err(|_| poisoned())?;
        match apps.iter_mut().find(|a| a.id == application.id) {
            Some(existing) => *existing = application,
            None => apps.push(application),
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<Application>, StoreError> {
        let apps = self.applications.read().map_err(|_| poisoned())?;
        Ok(apps.clone())
    }

    fn remove(&self, id: ApplicationId) -> Result<Application, StoreError> {
        let mut apps = self.applications.write().map_err(|_| poisoned())?;
        let idx = apps
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(apps.remove(idx))
    }
}
