//! `signon-core` — domain building blocks shared by the account administration crates.
//!
//! Pure domain primitives only: identifiers, errors, and the aggregate/event
//! contracts. Storage and network concerns live in the other crates.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{ApplicationId, UserId};
pub use value_object::ValueObject;
