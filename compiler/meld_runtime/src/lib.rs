//! Meld Runtime - object model for a dynamic, class-based language.
//!
//! This crate provides the machinery behind classes and modules as live
//! metaobjects: method tables, mixin composition, singleton metaclasses,
//! ancestor resolution and an ordered hash table that doubles as the
//! language's dictionary type.
//!
//! # Architecture
//!
//! - `Runtime`: owns every registry; all operations are methods on it
//! - `MetaObject`: a class, module or singleton, addressed by `MetaId`
//! - `HashTable`: insertion-ordered map with a string/symbol fast path
//! - `ScopeTree`: constant namespaces chained to their enclosing scope
//! - `errors`: structured `ErrorKind`, factory functions, the `Unwind` carrier
//!
//! Names come from `meld_ir`; a runtime and its host share one
//! `SharedInterner`.

pub mod errors;
pub mod hash;
mod ids;
pub mod meta;
pub mod method;
pub mod runtime;
pub mod scope;
mod stack;
pub mod value;

pub use errors::{CallResult, ErrorCategory, ErrorKind, RuntimeError, Unwind};
pub use hash::{FastKey, HashTable, KeyOps, RehashPlan, Slot};
pub use ids::{IdGen, LinkId, MetaId, ScopeId};
pub use meta::{Allocator, Attached, LinkageNode, MetaKind, MetaObject, Parent};
pub use method::{Arity, Invocation, Method, MethodBody, MethodRef, NativeFn};
pub use runtime::{
    escape, CoreClasses, Escape, EscapeTag, MethodResolution, Runtime, RuntimeBuilder,
    RuntimeConfig,
};
pub use scope::ScopeTree;
pub use stack::ensure_sufficient_stack;
pub use value::{NativeKind, ObjRef, ProcRef, Value};

pub use meld_ir::{well_known, Name, SharedInterner};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a stderr `tracing` subscriber for a runtime host.
///
/// Directives come from `MELD_LOG`, falling back to `RUST_LOG`
/// (`MELD_LOG=meld_runtime=trace`). Nothing is installed when neither is
/// set, or when the host already installed a global subscriber. Returns
/// whether this call installed one; later calls are no-ops.
pub fn init_tracing() -> bool {
    let mut installed = false;
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let Ok(directives) = std::env::var("MELD_LOG").or_else(|_| std::env::var("RUST_LOG"))
        else {
            return;
        };
        installed = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::new(directives))
            .try_init()
            .is_ok();
    });
    installed
}
