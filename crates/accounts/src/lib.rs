//! `signon-accounts` — user accounts, registered applications and permission grants.
//!
//! Decoupled from HTTP: the administrative surface and the revocation workflow
//! both talk to accounts through the [`AccountStore`] and [`ApplicationRegistry`]
//! contracts.

pub mod application;
pub mod permissions;
pub mod store;
pub mod user;

pub use application::{Application, RevocationContract};
pub use permissions::{Permission, PermissionGrant};
pub use store::{
    AccountStore, ApplicationRegistry, InMemoryAccountStore, InMemoryApplicationRegistry,
    StoreError,
};
pub use user::{
    CreateUser, GrantPermission, RemoveApplicationGrants, SuspendUser, UnsuspendUser, User,
    UserCommand, UserEvent, UserStatus,
};
