//! Class and module creation, allocation and instantiation.

use meld_ir::{well_known, Name};

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::ids::{MetaId, ScopeId};
use crate::meta::{Allocator, MetaKind};
use crate::method::Arity;
use crate::value::{ProcRef, Value};

impl Runtime {
    /// Define (or reopen) class `name` in the namespace `base`.
    ///
    /// Reopening checks that the existing constant is a class and, when a
    /// superclass is given, that it matches. A new class defaults to `Object`
    /// as its superclass and inherits the superclass's allocator unless one is
    /// given.
    #[tracing::instrument(level = "debug", skip_all, fields(name = self.name_str(name)))]
    pub fn define_class(
        &mut self,
        base: MetaId,
        superclass: Option<MetaId>,
        name: Name,
        allocator: Option<Allocator>,
    ) -> CallResult<MetaId> {
        let base_scope = self.meta(base).scope;
        if let Some(existing) = self.scopes.get_own(base_scope, name).cloned() {
            let qualified = self.qualified_name(base, name);
            let id = match existing {
                Value::Class(id) if self.meta(id).is_class() => id,
                _ => return Err(errors::not_a_class(&qualified)),
            };
            if let Some(requested) = superclass {
                if self.meta(id).superclass != Some(requested) {
                    return Err(errors::superclass_mismatch(&qualified));
                }
            }
            tracing::trace!(class = %qualified, "reopened");
            return Ok(id);
        }

        let id = self.create_class(superclass, Some(base_scope), allocator)?;
        self.const_set(base, name, Value::Class(id));
        self.fire_inherited(id)?;
        Ok(id)
    }

    /// Define (or reopen) module `name` in the namespace `base`.
    #[tracing::instrument(level = "debug", skip_all, fields(name = self.name_str(name)))]
    pub fn define_module(&mut self, base: MetaId, name: Name) -> CallResult<MetaId> {
        let base_scope = self.meta(base).scope;
        if let Some(existing) = self.scopes.get_own(base_scope, name).cloned() {
            return match existing {
                Value::Class(id) if self.meta(id).is_module() => Ok(id),
                _ => Err(errors::not_a_module(&self.qualified_name(base, name))),
            };
        }

        let id = self.alloc_meta(MetaKind::Module, Some(base_scope));
        self.const_set(base, name, Value::Class(id));
        Ok(id)
    }

    /// Anonymous class; `Object` when no superclass is given.
    pub fn new_class(&mut self, superclass: Option<MetaId>) -> CallResult<MetaId> {
        let object_scope = self.meta(self.core.object).scope;
        let id = self.create_class(superclass, Some(object_scope), None)?;
        self.fire_inherited(id)?;
        Ok(id)
    }

    /// Anonymous module.
    pub fn new_module(&mut self) -> MetaId {
        let object_scope = self.meta(self.core.object).scope;
        self.alloc_meta(MetaKind::Module, Some(object_scope))
    }

    fn create_class(
        &mut self,
        superclass: Option<MetaId>,
        scope_parent: Option<ScopeId>,
        allocator: Option<Allocator>,
    ) -> CallResult<MetaId> {
        let superclass = superclass.unwrap_or(self.core.object);
        if !self.meta(superclass).is_class() {
            return Err(errors::invalid_superclass(&self.display_name(superclass)));
        }
        let allocator = allocator.or_else(|| self.meta(superclass).allocator.clone());

        let id = self.alloc_meta(MetaKind::Class, scope_parent);
        self.set_superclass(id, superclass);
        self.meta_mut(id).allocator = allocator;
        tracing::debug!(
            superclass = %self.display_name(superclass),
            "class created"
        );
        Ok(id)
    }

    fn fire_inherited(&mut self, class: MetaId) -> CallResult<()> {
        if let Some(superclass) = self.meta(class).superclass {
            self.call_hook(
                &Value::Class(superclass),
                well_known::INHERITED,
                &[Value::Class(class)],
            )?;
        }
        Ok(())
    }

    /// `Base::Name`, or just `Name` at the top level.
    pub(crate) fn qualified_name(&self, base: MetaId, name: Name) -> String {
        if base == self.core.object {
            self.name_str(name).to_owned()
        } else {
            format!("{}::{}", self.display_name(base), self.name_str(name))
        }
    }

    /// Run `class`'s allocator.
    pub fn allocate(&mut self, class: MetaId) -> CallResult {
        let meta = self.meta(class);
        let allocator = match (meta.kind, &meta.allocator) {
            (MetaKind::Class, Some(allocator)) => allocator.clone(),
            _ => return Err(errors::not_instantiable(&self.display_name(class))),
        };
        allocator(self, class)
    }

    /// Allocate and run `initialize`, when one is defined.
    ///
    /// Without an `initialize`, passing arguments is an arity error.
    pub fn new_instance(
        &mut self,
        class: MetaId,
        args: &[Value],
        block: Option<&ProcRef>,
    ) -> CallResult {
        let instance = self.allocate(class)?;
        if self.respond_to(&instance, well_known::INITIALIZE)? {
            self.dispatch(&instance, well_known::INITIALIZE, args, block)?;
        } else if !args.is_empty() {
            return Err(errors::arity_mismatch(
                self.name_str(well_known::INITIALIZE),
                &self.display_name(class),
                Arity::Exact(0).describe(),
                args.len(),
            ));
        }
        Ok(instance)
    }

    /// Non-singleton class of any value.
    pub fn class_of(&self, value: &Value) -> MetaId {
        match value {
            Value::Object(obj) => obj.class(),
            Value::Class(id) => match self.meta(*id).kind {
                MetaKind::Module => self.core.module,
                MetaKind::Class | MetaKind::Singleton => self.core.class,
            },
            other => other
                .native_kind()
                .and_then(|kind| self.bridges.class_for(kind))
                .unwrap_or(self.core.object),
        }
    }

    pub fn superclass_of(&self, meta: MetaId) -> Option<MetaId> {
        self.meta(meta).superclass
    }
}
