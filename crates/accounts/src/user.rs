//! User aggregate: account lifecycle, suspension and permission grants.
//!
//! State only changes through events, so every transition the administrative
//! surface performs (create, grant, suspend, unsuspend) goes through
//! `handle` + `apply`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use signon_core::{Aggregate, AggregateRoot, ApplicationId, DomainError, Event, UserId};

use crate::{Permission, PermissionGrant};

// ─────────────────────────────────────────────────────────────────────────────
// User Status
// ─────────────────────────────────────────────────────────────────────────────

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserStatus {
    /// User may sign in to the applications they hold grants for.
    #[default]
    Active,
    /// User is denied access everywhere.
    Suspended,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "Active"),
            UserStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// User aggregate.
///
/// # Invariants
/// - A suspended user always carries a non-empty `reason_for_suspension`.
/// - An active user never carries a reason.
/// - At most one grant per application; permissions within a grant are unique.
/// - Suspended users cannot be granted new permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub status: UserStatus,
    pub reason_for_suspension: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub grants: Vec<PermissionGrant>,
    pub version: u64,
    pub created: bool,
}

impl User {
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            email: String::new(),
            name: String::new(),
            status: UserStatus::Active,
            reason_for_suspension: None,
            suspended_at: None,
            grants: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == UserStatus::Suspended
    }

    /// The grant held on `application_id`, if any.
    pub fn grant_for(&self, application_id: ApplicationId) -> Option<&PermissionGrant> {
        self.grants
            .iter()
            .find(|g| g.application_id == application_id)
    }

    pub fn has_permission(&self, application_id: ApplicationId, permission: &Permission) -> bool {
        self.grant_for(application_id)
            .is_some_and(|g| g.contains(permission))
    }

    /// Applications this user holds grants for, in first-grant order.
    pub fn applications_used(&self) -> Vec<ApplicationId> {
        self.grants.iter().map(|g| g.application_id).collect()
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command to grant one permission on one application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantPermission {
    pub user_id: UserId,
    pub application_id: ApplicationId,
    pub permission: Permission,
    pub occurred_at: DateTime<Utc>,
}

/// Command to suspend a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendUser {
    pub user_id: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command to lift a suspension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsuspendUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command to drop the user's grant on an application that is being removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveApplicationGrants {
    pub user_id: UserId,
    pub application_id: ApplicationId,
    pub occurred_at: DateTime<Utc>,
}

/// All user commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserCommand {
    Create(CreateUser),
    GrantPermission(GrantPermission),
    Suspend(SuspendUser),
    Unsuspend(UnsuspendUser),
    RemoveApplicationGrants(RemoveApplicationGrants),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreated {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGranted {
    pub user_id: UserId,
    pub application_id: ApplicationId,
    pub permission: Permission,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSuspended {
    pub user_id: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUnsuspended {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationGrantsRemoved {
    pub user_id: UserId,
    pub application_id: ApplicationId,
    pub occurred_at: DateTime<Utc>,
}

/// All user events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserEvent {
    Created(UserCreated),
    PermissionGranted(PermissionGranted),
    Suspended(UserSuspended),
    Unsuspended(UserUnsuspended),
    ApplicationGrantsRemoved(ApplicationGrantsRemoved),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => "accounts.user.created",
            UserEvent::PermissionGranted(_) => "accounts.user.permission_granted",
            UserEvent::Suspended(_) => "accounts.user.suspended",
            UserEvent::Unsuspended(_) => "accounts.user.unsuspended",
            UserEvent::ApplicationGrantsRemoved(_) => "accounts.user.application_grants_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Created(e) => e.occurred_at,
            UserEvent::PermissionGranted(e) => e.occurred_at,
            UserEvent::Suspended(e) => e.occurred_at,
            UserEvent::Unsuspended(e) => e.occurred_at,
            UserEvent::ApplicationGrantsRemoved(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Created(e) => self.apply_created(e),
            UserEvent::PermissionGranted(e) => self.apply_permission_granted(e),
            UserEvent::Suspended(e) => self.apply_suspended(e),
            UserEvent::Unsuspended(_) => self.apply_unsuspended(),
            UserEvent::ApplicationGrantsRemoved(e) => self.apply_grants_removed(e),
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Create(cmd) => self.handle_create(cmd),
            UserCommand::GrantPermission(cmd) => self.handle_grant(cmd),
            UserCommand::Suspend(cmd) => self.handle_suspend(cmd),
            UserCommand::Unsuspend(cmd) => self.handle_unsuspend(cmd),
            UserCommand::RemoveApplicationGrants(cmd) => self.handle_remove_grants(cmd),
        }
    }
}

impl User {
    // ─────────────────────────────────────────────────────────────────────────
    // Command Handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_create(&self, cmd: &CreateUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invariant("user already exists"));
        }

        if cmd.email.trim().is_empty() || !cmd.email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![UserEvent::Created(UserCreated {
            user_id: cmd.user_id,
            email: cmd.email.trim().to_lowercase(),
            name: cmd.name.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_grant(&self, cmd: &GrantPermission) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;

        if self.is_suspended() {
            return Err(DomainError::invariant("user is suspended"));
        }

        if cmd.permission.as_str().trim().is_empty() {
            return Err(DomainError::validation("permission name cannot be empty"));
        }

        // Already held: nothing to record.
        if self.has_permission(cmd.application_id, &cmd.permission) {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::PermissionGranted(PermissionGranted {
            user_id: cmd.user_id,
            application_id: cmd.application_id,
            permission: cmd.permission.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_suspend(&self, cmd: &SuspendUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;

        if self.is_suspended() {
            return Err(DomainError::invariant("user already suspended"));
        }

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation(
                "reason for suspension cannot be empty",
            ));
        }

        Ok(vec![UserEvent::Suspended(UserSuspended {
            user_id: cmd.user_id,
            reason: reason.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unsuspend(&self, cmd: &UnsuspendUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;

        if !self.is_suspended() {
            return Err(DomainError::invariant("user is not suspended"));
        }

        Ok(vec![UserEvent::Unsuspended(UserUnsuspended {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_grants(
        &self,
        cmd: &RemoveApplicationGrants,
    ) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_created()?;

        if self.grant_for(cmd.application_id).is_none() {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::ApplicationGrantsRemoved(
            ApplicationGrantsRemoved {
                user_id: cmd.user_id,
                application_id: cmd.application_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Appliers
    // ─────────────────────────────────────────────────────────────────────────

    fn apply_created(&mut self, e: &UserCreated) {
        self.id = e.user_id;
        self.email = e.email.clone();
        self.name = e.name.clone();
        self.status = UserStatus::Active;
        self.created = true;
    }

    fn apply_permission_granted(&mut self, e: &PermissionGranted) {
        match self
            .grants
            .iter_mut()
            .find(|g| g.application_id == e.application_id)
        {
            Some(grant) => {
                grant.insert(e.permission.clone());
            }
            None => {
                let mut grant = PermissionGrant::new(e.application_id);
                grant.insert(e.permission.clone());
                self.grants.push(grant);
            }
        }
    }

    fn apply_suspended(&mut self, e: &UserSuspended) {
        self.status = UserStatus::Suspended;
        self.reason_for_suspension = Some(e.reason.clone());
        self.suspended_at = Some(e.occurred_at);
    }

    fn apply_unsuspended(&mut self) {
        self.status = UserStatus::Active;
        self.reason_for_suspension = None;
        self.suspended_at = None;
    }

    fn apply_grants_removed(&mut self, e: &ApplicationGrantsRemoved) {
        self.grants.retain(|g| g.application_id != e.application_id);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_user(email: &str, name: &str) -> User {
        let user_id = UserId::new();
        let mut user = User::empty(user_id);
        user.execute(&UserCommand::Create(CreateUser {
            user_id,
            email: email.to_string(),
            name: name.to_string(),
            occurred_at: now(),
        }))
        .unwrap();
        user
    }

    fn grant(user: &mut User, application_id: ApplicationId, permission: &str) -> Vec<UserEvent> {
        let cmd = UserCommand::GrantPermission(GrantPermission {
            user_id: user.id,
            application_id,
            permission: Permission::new(permission.to_string()),
            occurred_at: now(),
        });
        user.execute(&cmd).unwrap()
    }

    fn suspend_cmd(user: &User, reason: &str) -> UserCommand {
        UserCommand::Suspend(SuspendUser {
            user_id: user.id,
            reason: reason.to_string(),
            occurred_at: now(),
        })
    }

    #[test]
    fn create_user_normalizes_email() {
        let user = created_user("  Alice@Example.com ", "Alice Smith");

        assert!(user.created);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.version, 1);
    }

    #[test]
    fn create_user_invalid_email() {
        let user_id = UserId::new();
        let user = User::empty(user_id);

        let result = user.handle(&UserCommand::Create(CreateUser {
            user_id,
            email: "invalid-email".to_string(),
            name: "Alice".to_string(),
            occurred_at: now(),
        }));

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn suspend_requires_a_reason() {
        let user = created_user("bob@example.com", "Bob");

        let err = user.handle(&suspend_cmd(&user, "   ")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(err.to_string().contains("reason"));
    }

    #[test]
    fn suspend_records_trimmed_reason_and_time() {
        let mut user = created_user("carol@example.com", "Carol");

        let cmd = suspend_cmd(&user, " Left the department ");

        let events = user.execute(&cmd).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "accounts.user.suspended");

        assert!(user.is_suspended());
        assert_eq!(
            user.reason_for_suspension.as_deref(),
            Some("Left the department")
        );
        assert!(user.suspended_at.is_some());
    }

    #[test]
    fn cannot_suspend_twice() {
        let mut user = created_user("dave@example.com", "Dave");
        let cmd = suspend_cmd(&user, "Policy violation");
        user.execute(&cmd).unwrap();

        let err = user.handle(&suspend_cmd(&user, "Again")).unwrap_err();
        assert!(err.to_string().contains("already suspended"));
    }

    #[test]
    fn unsuspend_clears_reason() {
        let mut user = created_user("erin@example.com", "Erin");
        let cmd = suspend_cmd(&user, "Test");
        user.execute(&cmd).unwrap();

        user.execute(&UserCommand::Unsuspend(UnsuspendUser {
            user_id: user.id,
            occurred_at: now(),
        }))
        .unwrap();

        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.reason_for_suspension, None);
        assert_eq!(user.suspended_at, None);
    }

    #[test]
    fn unsuspend_active_user_is_rejected() {
        let user = created_user("frank@example.com", "Frank");

        let result = user.handle(&UserCommand::Unsuspend(UnsuspendUser {
            user_id: user.id,
            occurred_at: now(),
        }));

        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn can_grant_permission_on_application() {
        let mut user = created_user("grace@example.com", "Grace");
        let app = ApplicationId::new();

        grant(&mut user, app, "Create publications");

        assert!(user.has_permission(app, &Permission::new("Create publications")));
        assert_eq!(user.applications_used(), vec![app]);
    }

    #[test]
    fn granting_an_already_granted_permission_does_not_duplicate() {
        let mut user = created_user("henry@example.com", "Henry");
        let app = ApplicationId::new();

        assert_eq!(grant(&mut user, app, "signin").len(), 1);
        assert!(grant(&mut user, app, "signin").is_empty());

        let grant = user.grant_for(app).unwrap();
        assert_eq!(grant.permissions(), &[Permission::SIGNIN]);
        assert_eq!(user.grants.len(), 1);
    }

    #[test]
    fn cannot_grant_to_suspended_user() {
        let mut user = created_user("ivy@example.com", "Ivy");
        let cmd = suspend_cmd(&user, "Test");
        user.execute(&cmd).unwrap();

        let result = user.handle(&UserCommand::GrantPermission(GrantPermission {
            user_id: user.id,
            application_id: ApplicationId::new(),
            permission: Permission::SIGNIN,
            occurred_at: now(),
        }));

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("suspended"));
    }

    #[test]
    fn applications_used_follow_first_grant_order() {
        let mut user = created_user("jack@example.com", "Jack");
        let (a, b) = (ApplicationId::new(), ApplicationId::new());

        grant(&mut user, b, "signin");
        grant(&mut user, a, "signin");
        grant(&mut user, b, "editor");

        assert_eq!(user.applications_used(), vec![b, a]);
    }

    #[test]
    fn removing_application_grants_drops_only_that_application() {
        let mut user = created_user("kate@example.com", "Kate");
        let (a, b) = (ApplicationId::new(), ApplicationId::new());
        grant(&mut user, a, "signin");
        grant(&mut user, b, "signin");

        let cmd = UserCommand::RemoveApplicationGrants(RemoveApplicationGrants {
            user_id: user.id,
            application_id: a,
            occurred_at: now(),
        });
        assert_eq!(user.execute(&cmd).unwrap().len(), 1);
        assert!(user.execute(&cmd).unwrap().is_empty());

        assert_eq!(user.applications_used(), vec![b]);
    }

    #[test]
    fn commands_on_missing_user_are_not_found() {
        let user = User::empty(UserId::new());
        let result = user.handle(&suspend_cmd(&user, "reason"));
        assert!(matches!(result, Err(DomainError::NotFound)));
    }
}
