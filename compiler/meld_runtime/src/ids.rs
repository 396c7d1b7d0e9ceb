//! Typed arena indices and the runtime id generator.
//!
//! Metaobjects, linkage nodes and constant scopes live in arenas owned by the
//! `Runtime`; everything else refers to them through these `u32` indices, so
//! back-references (singleton ↔ owner, module ↔ dependents) never form
//! ownership cycles.

use std::fmt;

macro_rules! arena_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Build from an arena length. Arenas never exceed `u32::MAX` entries.
            #[inline]
            pub(crate) fn from_len(len: usize) -> Self {
                $name(u32::try_from(len).unwrap_or(u32::MAX))
            }

            /// Position in the owning arena.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Raw id value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

arena_index!(
    /// Index of a class, module or singleton metaobject.
    MetaId
);

arena_index!(
    /// Index of a mixin linkage node.
    LinkId
);

arena_index!(
    /// Index of a constant scope.
    ScopeId
);

/// Monotonically increasing id source.
///
/// Object ids, method ids and escape tags all come from the same counter, so an
/// id is unique within one runtime regardless of what it names.
#[derive(Debug)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        IdGen { next: 1 }
    }

    /// Hand out the next id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_gen_is_monotonic() {
        let mut ids = IdGen::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_arena_index_roundtrip() {
        let id = MetaId::from_len(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.raw(), 7);
        assert_eq!(format!("{id:?}"), "MetaId(7)");
    }
}
