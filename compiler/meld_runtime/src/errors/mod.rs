//! Runtime errors and the unwinding carrier.
//!
//! `ErrorKind` is the structured error category; its `Display` renders the
//! user-visible message. The factory functions below are the public way to
//! build errors: each one fills in the kind and wraps it in [`Unwind`] so call
//! sites can return them directly with `Err(...)?` style propagation.
//!
//! Messages name the offending method or constant together with the display
//! name of the owning metaobject, resolved by the caller at raise time.

use std::fmt;

use crate::runtime::Escape;

/// Result of any operation that can raise or escape.
pub type CallResult<T = crate::value::Value> = Result<T, Unwind>;

/// Broad classification of a runtime error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The caller broke an object-model rule.
    ContractViolation,
    /// A name could not be resolved and no missing-hook took the call.
    LookupFailure,
    /// The metaobject graph itself is corrupt.
    InternalInvariantBreach,
    /// Raised by a method body, or a resource limit.
    Raised,
}

/// Structured error kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    // Contract
    SuperclassMismatch {
        class: String,
    },
    NotAClass {
        name: String,
    },
    NotAModule {
        name: String,
    },
    InvalidSuperclass {
        name: String,
    },
    CyclicInclude {
        module: String,
        into: String,
    },
    UndefinedName {
        method: String,
        owner: String,
    },
    MethodNotDefinedHere {
        method: String,
        owner: String,
    },
    ArityMismatch {
        method: String,
        owner: String,
        expected: String,
        got: usize,
    },
    NotInstantiable {
        name: String,
    },
    NoSingleton {
        kind: &'static str,
    },
    DuplicateBridge {
        kind: &'static str,
    },
    InvalidHashCode {
        class: String,
    },
    NotAHash {
        kind: String,
    },
    HashInUse,

    // Lookup
    UndefinedMethod {
        method: String,
        receiver: String,
    },
    NoSuperclassMethod {
        method: String,
        receiver: String,
    },
    UninitializedConstant {
        path: String,
    },

    // Invariant
    AncestorCycle {
        name: String,
    },

    // Raised
    StackOverflow {
        depth: usize,
    },
    Raised {
        class: String,
        message: String,
    },
}

impl ErrorKind {
    /// Category this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SuperclassMismatch { .. }
            | Self::NotAClass { .. }
            | Self::NotAModule { .. }
            | Self::InvalidSuperclass { .. }
            | Self::CyclicInclude { .. }
            | Self::UndefinedName { .. }
            | Self::MethodNotDefinedHere { .. }
            | Self::ArityMismatch { .. }
            | Self::NotInstantiable { .. }
            | Self::NoSingleton { .. }
            | Self::DuplicateBridge { .. }
            | Self::InvalidHashCode { .. }
            | Self::NotAHash { .. }
            | Self::HashInUse => ErrorCategory::ContractViolation,
            Self::UndefinedMethod { .. }
            | Self::NoSuperclassMethod { .. }
            | Self::UninitializedConstant { .. } => ErrorCategory::LookupFailure,
            Self::AncestorCycle { .. } => ErrorCategory::InternalInvariantBreach,
            Self::StackOverflow { .. } | Self::Raised { .. } => ErrorCategory::Raised,
        }
    }

    /// Class name a host would raise this kind as.
    pub fn class_name(&self) -> &str {
        match self {
            Self::SuperclassMismatch { .. }
            | Self::NotAClass { .. }
            | Self::NotAModule { .. }
            | Self::InvalidSuperclass { .. }
            | Self::NoSingleton { .. }
            | Self::NotAHash { .. } => "TypeError",
            Self::CyclicInclude { .. } | Self::ArityMismatch { .. } => "ArgumentError",
            Self::UndefinedName { .. }
            | Self::MethodNotDefinedHere { .. }
            | Self::UndefinedMethod { .. }
            | Self::NoSuperclassMethod { .. } => "NoMethodError",
            Self::NotInstantiable { .. } | Self::DuplicateBridge { .. } => "TypeError",
            Self::InvalidHashCode { .. } => "TypeError",
            Self::HashInUse => "RuntimeError",
            Self::UninitializedConstant { .. } => "NameError",
            Self::AncestorCycle { .. } => "FatalError",
            Self::StackOverflow { .. } => "SystemStackError",
            Self::Raised { class, .. } => class,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuperclassMismatch { class } => {
                write!(f, "superclass mismatch for class {class}")
            }
            Self::NotAClass { name } => write!(f, "{name} is not a class"),
            Self::NotAModule { name } => {
                write!(f, "wrong argument type {name} (expected Module)")
            }
            Self::InvalidSuperclass { name } => {
                write!(f, "superclass must be a Class ({name} given)")
            }
            Self::CyclicInclude { module, into } => {
                write!(f, "cyclic include detected: {module} into {into}")
            }
            Self::UndefinedName { method, owner } => {
                write!(f, "undefined method '{method}' for class '{owner}'")
            }
            Self::MethodNotDefinedHere { method, owner } => {
                write!(f, "method '{method}' not defined in {owner}")
            }
            Self::ArityMismatch {
                method,
                owner,
                expected,
                got,
            } => write!(
                f,
                "wrong number of arguments calling {owner}#{method} (given {got}, expected {expected})"
            ),
            Self::NotInstantiable { name } => write!(f, "allocator undefined for {name}"),
            Self::NoSingleton { kind } => write!(f, "can't define singleton for {kind}"),
            Self::DuplicateBridge { kind } => write!(f, "native type {kind} is already bridged"),
            Self::InvalidHashCode { class } => {
                write!(f, "{class}#hash must return an integer")
            }
            Self::NotAHash { kind } => write!(f, "wrong argument type {kind} (expected Hash)"),
            Self::HashInUse => write!(f, "can't modify hash during iteration"),
            Self::UndefinedMethod { method, receiver } => {
                write!(f, "undefined method '{method}' for {receiver}")
            }
            Self::NoSuperclassMethod { method, receiver } => {
                write!(f, "super: no superclass method '{method}' for {receiver}")
            }
            Self::UninitializedConstant { path } => write!(f, "uninitialized constant {path}"),
            Self::AncestorCycle { name } => {
                write!(f, "ancestor chain of {name} revisits itself")
            }
            Self::StackOverflow { depth } => {
                write!(f, "stack level too deep (limit: {depth})")
            }
            Self::Raised { message, .. } => write!(f, "{message}"),
        }
    }
}

/// A runtime error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        RuntimeError { kind }
    }

    /// Error raised by a method body.
    pub fn raised(class: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::new(ErrorKind::Raised {
            class: class.into(),
            message: message.into(),
        })
    }

    #[inline]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

/// Anything that leaves a call early: an error, or an escape headed for a
/// matching `catch_escape` boundary.
#[derive(Debug, thiserror::Error)]
pub enum Unwind {
    #[error(transparent)]
    Error(#[from] RuntimeError),
    #[error("escape with no matching catch ({0:?})")]
    Escape(Escape),
}

impl Unwind {
    /// The error, if this is one.
    pub fn as_error(&self) -> Option<&RuntimeError> {
        match self {
            Unwind::Error(err) => Some(err),
            Unwind::Escape(_) => None,
        }
    }

    /// Error kind, if this is an error.
    pub fn kind(&self) -> Option<&ErrorKind> {
        self.as_error().map(|err| &err.kind)
    }

    /// Error category, if this is an error.
    pub fn category(&self) -> Option<ErrorCategory> {
        self.as_error().map(RuntimeError::category)
    }
}

impl From<ErrorKind> for Unwind {
    fn from(kind: ErrorKind) -> Self {
        Unwind::Error(RuntimeError::new(kind))
    }
}

// Factory functions

#[cold]
pub fn superclass_mismatch(class: &str) -> Unwind {
    ErrorKind::SuperclassMismatch {
        class: class.to_owned(),
    }
    .into()
}

#[cold]
pub fn not_a_class(name: &str) -> Unwind {
    ErrorKind::NotAClass {
        name: name.to_owned(),
    }
    .into()
}

#[cold]
pub fn not_a_module(name: &str) -> Unwind {
    ErrorKind::NotAModule {
        name: name.to_owned(),
    }
    .into()
}

#[cold]
pub fn invalid_superclass(name: &str) -> Unwind {
    ErrorKind::InvalidSuperclass {
        name: name.to_owned(),
    }
    .into()
}

#[cold]
pub fn cyclic_include(module: &str, into: &str) -> Unwind {
    ErrorKind::CyclicInclude {
        module: module.to_owned(),
        into: into.to_owned(),
    }
    .into()
}

#[cold]
pub fn undefined_name(method: &str, owner: &str) -> Unwind {
    ErrorKind::UndefinedName {
        method: method.to_owned(),
        owner: owner.to_owned(),
    }
    .into()
}

#[cold]
pub fn method_not_defined_here(method: &str, owner: &str) -> Unwind {
    ErrorKind::MethodNotDefinedHere {
        method: method.to_owned(),
        owner: owner.to_owned(),
    }
    .into()
}

#[cold]
pub fn arity_mismatch(method: &str, owner: &str, expected: String, got: usize) -> Unwind {
    ErrorKind::ArityMismatch {
        method: method.to_owned(),
        owner: owner.to_owned(),
        expected,
        got,
    }
    .into()
}

#[cold]
pub fn not_instantiable(name: &str) -> Unwind {
    ErrorKind::NotInstantiable {
        name: name.to_owned(),
    }
    .into()
}

#[cold]
pub fn no_singleton(kind: &'static str) -> Unwind {
    ErrorKind::NoSingleton { kind }.into()
}

#[cold]
pub fn duplicate_bridge(kind: &'static str) -> Unwind {
    ErrorKind::DuplicateBridge { kind }.into()
}

#[cold]
pub fn invalid_hash_code(class: &str) -> Unwind {
    ErrorKind::InvalidHashCode {
        class: class.to_owned(),
    }
    .into()
}

#[cold]
pub fn not_a_hash(kind: &str) -> Unwind {
    ErrorKind::NotAHash {
        kind: kind.to_owned(),
    }
    .into()
}

#[cold]
pub fn hash_in_use() -> Unwind {
    ErrorKind::HashInUse.into()
}

#[cold]
pub fn undefined_method(method: &str, receiver: &str) -> Unwind {
    ErrorKind::UndefinedMethod {
        method: method.to_owned(),
        receiver: receiver.to_owned(),
    }
    .into()
}

#[cold]
pub fn no_superclass_method(method: &str, receiver: &str) -> Unwind {
    ErrorKind::NoSuperclassMethod {
        method: method.to_owned(),
        receiver: receiver.to_owned(),
    }
    .into()
}

#[cold]
pub fn uninitialized_constant(path: String) -> Unwind {
    ErrorKind::UninitializedConstant { path }.into()
}

#[cold]
pub fn ancestor_cycle(name: &str) -> Unwind {
    ErrorKind::AncestorCycle {
        name: name.to_owned(),
    }
    .into()
}

#[cold]
pub fn stack_overflow(depth: usize) -> Unwind {
    ErrorKind::StackOverflow { depth }.into()
}

/// Error raised by a method body: `raise(kind_name, message)`.
#[cold]
pub fn raise(class: &str, message: impl Into<String>) -> Unwind {
    RuntimeError::raised(class, message).into()
}
