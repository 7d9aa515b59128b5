//! Slot keys: the opaque, comparable handle a [`crate::Task`] declares as input or output.

use std::any::{Any, TypeId};
use std::fmt;

/// Zero-sized marker type backing the null slot `∅` — the always-satisfied "no dependency" input.
#[derive(Debug)]
enum NullSlot {}

/// An opaque identifier for a typed cell in a [`crate::Collection`].
///
/// Backed by [`TypeId`], so any Rust type can serve as a slot name: declare a marker type per
/// slot (or reuse the payload type itself if it is unique per slot) and key on
/// `SlotKey::of::<T>()`. Two `SlotKey`s are equal iff they were built from the same type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl SlotKey {
    /// The slot key for type `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The sentinel null slot `∅`: always satisfied, meaning "no dependency".
    pub fn null() -> Self {
        Self::of::<NullSlot>()
    }

    /// Whether this is the null slot.
    pub fn is_null(self) -> bool {
        self == Self::null()
    }

    /// The type name backing this slot, for diagnostics only — not part of equality.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "SlotKey(∅)")
        } else {
            write!(f, "SlotKey({})", self.type_name)
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "∅")
        } else {
            write!(f, "{}", self.type_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Goods;
    struct Shops;

    #[test]
    fn same_type_same_key() {
        assert_eq!(SlotKey::of::<Goods>(), SlotKey::of::<Goods>());
    }

    #[test]
    fn different_types_different_keys() {
        assert_ne!(SlotKey::of::<Goods>(), SlotKey::of::<Shops>());
    }

    #[test]
    fn null_is_stable_and_distinguished() {
        assert_eq!(SlotKey::null(), SlotKey::null());
        assert!(SlotKey::null().is_null());
        assert!(!SlotKey::of::<Goods>().is_null());
    }
}
