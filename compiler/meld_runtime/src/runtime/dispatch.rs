//! Method lookup, dispatch and super-dispatch.
//!
//! # Resolution Order
//!
//! 1. Native values with a bridge: the bridge's flattened table.
//! 2. Everything else: the precedence list of the receiver's dispatch
//!    metaobject (its singleton if it has one, else its class; class values
//!    always use their singleton). The first table holding the name decides.
//!    An undefined marker stops the walk.
//! 3. Names known to the stub registry resolve to the not-understood path.
//!
//! A call that resolves to nothing goes to the receiver's `method_missing`
//! with the name prepended to the arguments; without one it is a lookup error.

use std::rc::Rc;

use meld_ir::{well_known, Name};

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::ids::MetaId;
use crate::method::{Invocation, MethodBody, MethodRef};
use crate::stack::ensure_sufficient_stack;
use crate::value::{ProcRef, Value};

/// Result of looking a name up for a receiver.
#[derive(Clone, Debug)]
pub enum MethodResolution {
    /// A callable record.
    Found(MethodRef),
    /// Explicitly undefined, or only known to the stub registry.
    Undefined,
    NotFound,
}

impl MethodResolution {
    pub fn method(&self) -> Option<&MethodRef> {
        match self {
            MethodResolution::Found(method) => Some(method),
            _ => None,
        }
    }
}

/// Which call produced a miss, for the error raised without a hook.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Miss {
    Method,
    Super,
}

impl Runtime {
    /// Metaobject whose precedence list answers calls on `value`.
    pub fn dispatch_meta(&mut self, value: &Value) -> CallResult<MetaId> {
        match value {
            Value::Object(obj) => Ok(obj.singleton().unwrap_or_else(|| obj.class())),
            Value::Class(id) => self.singleton_of_meta(*id),
            other => Ok(self.class_of(other)),
        }
    }

    /// Look `name` up for `receiver` without calling anything.
    pub fn resolve(&mut self, receiver: &Value, name: Name) -> CallResult<MethodResolution> {
        if let Some(kind) = receiver.native_kind() {
            if self.bridges.class_for(kind).is_some() {
                return Ok(match self.bridges.lookup(kind, name) {
                    Some(method) if method.is_stub() => MethodResolution::Undefined,
                    Some(method) => MethodResolution::Found(Rc::clone(method)),
                    None => self.miss(name),
                });
            }
        }
        let meta = self.dispatch_meta(receiver)?;
        self.resolve_in(meta, name)
    }

    /// Look `name` up along the precedence list of `meta`.
    pub fn resolve_in(&mut self, meta: MetaId, name: Name) -> CallResult<MethodResolution> {
        let chain = self.ancestors_of(meta)?;
        for id in chain.iter() {
            if let Some(method) = self.meta(*id).methods.get_name(name) {
                return Ok(if method.is_stub() {
                    MethodResolution::Undefined
                } else {
                    MethodResolution::Found(Rc::clone(method))
                });
            }
        }
        Ok(self.miss(name))
    }

    fn miss(&self, name: Name) -> MethodResolution {
        if self.stubs.contains(name) {
            MethodResolution::Undefined
        } else {
            MethodResolution::NotFound
        }
    }

    /// Send `name` to `receiver`.
    pub fn dispatch(
        &mut self,
        receiver: &Value,
        name: Name,
        args: &[Value],
        block: Option<&ProcRef>,
    ) -> CallResult {
        match self.resolve(receiver, name)? {
            MethodResolution::Found(method) => self.invoke(receiver, &method, args, block),
            MethodResolution::Undefined | MethodResolution::NotFound => {
                self.not_understood(receiver, name, args, block, Miss::Method)
            }
        }
    }

    /// Continue the lookup of `name` past the owner of `current`.
    ///
    /// The walk starts after `explicit_owner` when given, else after
    /// `current.owner`, and skips records that are `current` itself (donated
    /// copies share its id), so it never comes back to the running method.
    pub fn super_dispatch(
        &mut self,
        receiver: &Value,
        name: Name,
        current: &MethodRef,
        explicit_owner: Option<MetaId>,
        args: &[Value],
        block: Option<&ProcRef>,
    ) -> CallResult {
        let meta = self.dispatch_meta(receiver)?;
        let chain = self.ancestors_of(meta)?;
        let owner = explicit_owner.unwrap_or(current.owner);
        let start = chain.iter().position(|id| *id == owner).or_else(|| {
            chain.iter().position(|id| {
                self.meta(*id)
                    .methods
                    .get_name(name)
                    .is_some_and(|method| method.id == current.id)
            })
        });

        if let Some(start) = start {
            for id in &chain[start + 1..] {
                let Some(method) = self.meta(*id).methods.get_name(name) else {
                    continue;
                };
                if method.id == current.id {
                    continue;
                }
                if method.is_stub() {
                    break;
                }
                let method = Rc::clone(method);
                return self.invoke(receiver, &method, args, block);
            }
        }
        self.not_understood(receiver, name, args, block, Miss::Super)
    }

    /// Run `method` with `receiver`, checking arity and call depth.
    pub fn invoke(
        &mut self,
        receiver: &Value,
        method: &MethodRef,
        args: &[Value],
        block: Option<&ProcRef>,
    ) -> CallResult {
        let body = match &method.body {
            MethodBody::Native(body) => Rc::clone(body),
            MethodBody::Stub => {
                return self.not_understood(receiver, method.name, args, block, Miss::Method)
            }
        };
        if !method.arity.accepts(args.len()) {
            return Err(errors::arity_mismatch(
                self.name_str(method.name),
                &self.display_name(method.owner),
                method.arity.describe(),
                args.len(),
            ));
        }
        let limit = self.config.max_call_depth;
        if self.depth >= limit {
            return Err(errors::stack_overflow(limit));
        }

        self.depth += 1;
        let invocation = Invocation {
            receiver,
            method,
            args,
            block,
        };
        let result = ensure_sufficient_stack(|| body(self, &invocation));
        self.depth -= 1;
        result
    }

    fn not_understood(
        &mut self,
        receiver: &Value,
        name: Name,
        args: &[Value],
        block: Option<&ProcRef>,
        miss: Miss,
    ) -> CallResult {
        tracing::trace!(method = self.name_str(name), ?miss, "not understood");
        if name != well_known::METHOD_MISSING {
            if let MethodResolution::Found(hook) = self.resolve(receiver, well_known::METHOD_MISSING)? {
                let mut forwarded = Vec::with_capacity(args.len() + 1);
                forwarded.push(Value::Symbol(name));
                forwarded.extend_from_slice(args);
                return self.invoke(receiver, &hook, &forwarded, block);
            }
        }
        let method = self.name_str(name);
        let description = self.describe(receiver);
        Err(match miss {
            Miss::Method => errors::undefined_method(method, &description),
            Miss::Super => errors::no_superclass_method(method, &description),
        })
    }

    /// Whether `value` has a callable method `name`.
    pub fn respond_to(&mut self, value: &Value, name: Name) -> CallResult<bool> {
        Ok(matches!(self.resolve(value, name)?, MethodResolution::Found(_)))
    }

    /// Metaobject that owns the record `name` resolves to on `value`.
    pub fn method_owner(&mut self, value: &Value, name: Name) -> CallResult<Option<MetaId>> {
        Ok(self.resolve(value, name)?.method().map(|method| method.owner))
    }

    /// Call `name` on `receiver` if it resolves, without the not-understood
    /// path. Used for the `inherited`/`included`/`extended`/`const_missing`
    /// hooks.
    pub(crate) fn call_hook(
        &mut self,
        receiver: &Value,
        name: Name,
        args: &[Value],
    ) -> CallResult<Option<Value>> {
        match self.resolve(receiver, name)? {
            MethodResolution::Found(hook) => {
                tracing::trace!(hook = self.name_str(name), "calling hook");
                self.invoke(receiver, &hook, args, None).map(Some)
            }
            MethodResolution::Undefined | MethodResolution::NotFound => Ok(None),
        }
    }
}
