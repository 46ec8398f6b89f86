//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. A
/// permission name is a value object; a user is not (two users with the same
/// email are still different accounts).
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Permission(String);
///
/// impl ValueObject for Permission {}
///
/// assert_eq!(Permission("signin".into()), Permission("signin".into()));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
