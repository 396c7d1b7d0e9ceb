//! Method records.
//!
//! A record is immutable once built and shared through `Rc`: redefining a name
//! replaces the table entry, it never mutates a record other tables may hold.
//! Donated copies keep the original's `id` and `owner` and add a `donor`, which
//! is how super-resolution recognises "the same method" across tables.

use std::fmt;
use std::rc::Rc;

use meld_ir::Name;

use crate::errors::CallResult;
use crate::ids::MetaId;
use crate::runtime::Runtime;
use crate::value::{ProcRef, Value};

/// Native method body.
pub type NativeFn = Rc<dyn Fn(&mut Runtime, &Invocation<'_>) -> CallResult>;

/// What running a method does.
#[derive(Clone)]
pub enum MethodBody {
    Native(NativeFn),
    /// Undefined marker: lookup stops here and the call goes to the
    /// not-understood path.
    Stub,
}

impl MethodBody {
    /// Wrap a closure as a native body.
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&mut Runtime, &Invocation<'_>) -> CallResult + 'static,
    {
        MethodBody::Native(Rc::new(f))
    }

    #[inline]
    pub fn is_stub(&self) -> bool {
        matches!(self, MethodBody::Stub)
    }
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodBody::Native(_) => write!(f, "Native(..)"),
            MethodBody::Stub => write!(f, "Stub"),
        }
    }
}

/// Accepted argument counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Any => true,
        }
    }

    /// Expected count as shown in arity errors.
    pub fn describe(self) -> String {
        match self {
            Arity::Exact(n) => n.to_string(),
            Arity::AtLeast(n) => format!("{n}+"),
            Arity::Any => "any".to_owned(),
        }
    }
}

/// One entry in a method table.
#[derive(Debug)]
pub struct Method {
    /// Shared between a record and its donated copies.
    pub id: u64,
    pub name: Name,
    /// Metaobject the method was defined on.
    pub owner: MetaId,
    /// Module this copy was donated from; `None` for own definitions.
    pub donor: Option<MetaId>,
    pub arity: Arity,
    pub body: MethodBody,
}

pub type MethodRef = Rc<Method>;

impl Method {
    pub fn new(id: u64, name: Name, owner: MetaId, arity: Arity, body: MethodBody) -> Self {
        Method {
            id,
            name,
            owner,
            donor: None,
            arity,
            body,
        }
    }

    /// Copy of this record as donated by `from`.
    pub fn donated_by(&self, from: MetaId) -> Method {
        Method {
            id: self.id,
            name: self.name,
            owner: self.owner,
            donor: Some(from),
            arity: self.arity,
            body: self.body.clone(),
        }
    }

    #[inline]
    pub fn is_donated(&self) -> bool {
        self.donor.is_some()
    }

    #[inline]
    pub fn is_stub(&self) -> bool {
        self.body.is_stub()
    }
}

/// Arguments of one method call, as seen by a native body.
pub struct Invocation<'a> {
    pub receiver: &'a Value,
    /// Record being run; pass it back to `super_dispatch`.
    pub method: &'a MethodRef,
    pub args: &'a [Value],
    pub block: Option<&'a ProcRef>,
}

impl Invocation<'_> {
    /// Argument at `index`, or `nil`.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Nil)
    }

    #[inline]
    pub fn name(&self) -> Name {
        self.method.name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Exact(2).accepts(2));
        assert!(!Arity::Exact(2).accepts(1));
        assert!(Arity::AtLeast(1).accepts(4));
        assert!(!Arity::AtLeast(1).accepts(0));
        assert!(Arity::Any.accepts(0));
        assert_eq!(Arity::AtLeast(1).describe(), "1+");
    }

    #[test]
    fn test_donated_copy_keeps_identity() {
        let owner = MetaId::from_len(3);
        let donor = MetaId::from_len(9);
        let original = Method::new(7, Name::from_raw(60), owner, Arity::Any, MethodBody::Stub);
        let copy = original.donated_by(donor);
        assert_eq!(copy.id, original.id);
        assert_eq!(copy.owner, owner);
        assert_eq!(copy.donor, Some(donor));
        assert!(!original.is_donated());
        assert!(copy.is_stub());
    }
}
