//! Interned identifier.
//!
//! A `Name` is a dense index into a [`StringInterner`](crate::StringInterner).
//! Two names are equal exactly when they were interned from equal strings by
//! the same interner.

use std::fmt;

/// Interned string identifier.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Create from a raw index.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    /// Get the raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Index into the interner's string storage.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is one of the names in [`well_known`].
    #[inline]
    pub const fn is_well_known(self) -> bool {
        (self.0 as usize) < WELL_KNOWN.len()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_well_known() {
            write!(f, "Name({:?})", WELL_KNOWN[self.index()])
        } else {
            write!(f, "Name({})", self.0)
        }
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Strings interned at construction, in id order.
///
/// The position of each entry is its `Name` id; the constants in
/// [`well_known`] must stay in sync with this table.
pub(crate) const WELL_KNOWN: &[&str] = &[
    "",
    "Object",
    "Module",
    "Class",
    "initialize",
    "method_missing",
    "inherited",
    "included",
    "extended",
    "const_missing",
    "hash",
    "eql?",
];

/// Names with fixed ids, usable without an interner.
pub mod well_known {
    use super::Name;

    pub const OBJECT: Name = Name::from_raw(1);
    pub const MODULE: Name = Name::from_raw(2);
    pub const CLASS: Name = Name::from_raw(3);
    pub const INITIALIZE: Name = Name::from_raw(4);
    pub const METHOD_MISSING: Name = Name::from_raw(5);
    pub const INHERITED: Name = Name::from_raw(6);
    pub const INCLUDED: Name = Name::from_raw(7);
    pub const EXTENDED: Name = Name::from_raw(8);
    pub const CONST_MISSING: Name = Name::from_raw(9);
    pub const HASH: Name = Name::from_raw(10);
    pub const EQL: Name = Name::from_raw(11);
}
