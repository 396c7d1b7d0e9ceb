//! Lazily created singleton metaobjects.
//!
//! A singleton's superclass depends on what it is attached to:
//!
//! | owner        | singleton superclass                       |
//! |--------------|--------------------------------------------|
//! | object       | the object's class                         |
//! | class `C`    | singleton of `C`'s superclass, or `Class`  |
//! | module       | `Module`                                   |
//! | singleton    | same rule as a class                       |
//!
//! Once built, a singleton is cached on its owner and returned unchanged by
//! every later call.

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::ids::MetaId;
use crate::meta::{Attached, MetaKind};
use crate::stack::ensure_sufficient_stack;
use crate::value::{ObjRef, Value};

impl Runtime {
    /// Singleton of any object or metaobject. Native values have none.
    pub fn singleton_of(&mut self, value: &Value) -> CallResult<MetaId> {
        match value {
            Value::Object(obj) => Ok(self.singleton_of_object(obj)),
            Value::Class(id) => self.singleton_of_meta(*id),
            other => {
                let kind = other.native_kind().map_or("value", |kind| kind.label());
                Err(errors::no_singleton(kind))
            }
        }
    }

    fn singleton_of_object(&mut self, obj: &ObjRef) -> MetaId {
        if let Some(existing) = obj.singleton() {
            return existing;
        }
        let class = obj.class();
        let scope_parent = Some(self.meta(class).scope);
        let singleton = self.alloc_meta(MetaKind::Singleton, scope_parent);
        self.set_superclass(singleton, class);
        self.meta_mut(singleton).attached = Some(Attached::Object(obj.id()));
        obj.set_singleton(singleton);
        tracing::trace!(object = obj.id(), "object singleton created");
        singleton
    }

    /// Singleton of a class, module or singleton.
    pub fn singleton_of_meta(&mut self, owner: MetaId) -> CallResult<MetaId> {
        if let Some(existing) = self.meta(owner).singleton {
            return Ok(existing);
        }

        let (kind, parent) = (self.meta(owner).kind, self.meta(owner).superclass);
        let superclass = match kind {
            MetaKind::Module => self.core.module,
            MetaKind::Class | MetaKind::Singleton => match parent {
                Some(parent) => ensure_sufficient_stack(|| self.singleton_of_meta(parent))?,
                None => self.core.class,
            },
        };

        let scope_parent = Some(self.meta(owner).scope);
        let singleton = self.alloc_meta(MetaKind::Singleton, scope_parent);
        self.set_superclass(singleton, superclass);
        self.meta_mut(singleton).attached = Some(Attached::Meta(owner));
        self.meta_mut(owner).singleton = Some(singleton);
        tracing::trace!(owner = %self.display_name(owner), "singleton created");
        Ok(singleton)
    }

    /// Metaobject a value's singleton is attached to, if it is one.
    pub fn attached_meta(&self, singleton: MetaId) -> Option<MetaId> {
        match self.meta(singleton).attached {
            Some(Attached::Meta(owner)) => Some(owner),
            _ => None,
        }
    }
}
