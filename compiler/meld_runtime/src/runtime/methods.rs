//! Method definition, undefinition and removal.

use std::rc::Rc;

use meld_ir::Name;
use rustc_hash::FxHashSet;

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::ids::MetaId;
use crate::method::{Arity, Method, MethodBody, MethodRef};
use crate::value::Value;

impl Runtime {
    /// Define `name` on `owner`, replacing any previous own definition.
    ///
    /// On a module the new record reaches every dependent that does not
    /// define `name` itself. With the module-function flag set, the method is
    /// also defined on the module's singleton.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(owner = %self.display_name(owner), method = self.name_str(name))
    )]
    pub fn define_method(
        &mut self,
        owner: MetaId,
        name: Name,
        arity: Arity,
        body: MethodBody,
    ) -> CallResult<MethodRef> {
        let also_singleton = self.meta(owner).is_module() && self.meta(owner).module_function;
        let method = self.install_method(owner, name, arity, body.clone())?;
        if also_singleton {
            let singleton = self.singleton_of_meta(owner)?;
            self.install_method(singleton, name, arity, body)?;
        }
        Ok(method)
    }

    /// Define `name` on the singleton of `target`.
    pub fn define_singleton_method(
        &mut self,
        target: &Value,
        name: Name,
        arity: Arity,
        body: MethodBody,
    ) -> CallResult<MethodRef> {
        let singleton = self.singleton_of(target)?;
        self.install_method(singleton, name, arity, body)
    }

    fn install_method(
        &mut self,
        owner: MetaId,
        name: Name,
        arity: Arity,
        body: MethodBody,
    ) -> CallResult<MethodRef> {
        let id = self.ids.next_id();
        let is_stub = body.is_stub();
        let method = Rc::new(Method::new(id, name, owner, arity, body));
        self.meta_mut(owner)
            .methods
            .put_name(name, Rc::clone(&method));
        if self.config.auto_register_stubs && !is_stub {
            self.register_stub(name);
        }
        self.propagate(owner, name);
        self.refresh_bridges_for(owner)?;
        Ok(method)
    }

    /// Stop lookup of `name` at `owner`.
    ///
    /// The name has to resolve somewhere in `owner`'s ancestors first.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(owner = %self.display_name(owner), method = self.name_str(name))
    )]
    pub fn undef_method(&mut self, owner: MetaId, name: Name) -> CallResult<()> {
        let chain = self.ancestors_of(owner)?;
        let defined = chain.iter().find_map(|id| self.meta(*id).methods.get_name(name));
        if !defined.is_some_and(|method| !method.is_stub()) {
            return Err(errors::undefined_name(
                self.name_str(name),
                &self.display_name(owner),
            ));
        }
        self.install_method(owner, name, Arity::Any, MethodBody::Stub)?;
        Ok(())
    }

    /// Remove `owner`'s own definition of `name`.
    ///
    /// Whatever `owner`'s mixins provide for `name` takes its place, and
    /// dependents holding a copy from `owner` are recomputed.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(owner = %self.display_name(owner), method = self.name_str(name))
    )]
    pub fn remove_method(&mut self, owner: MetaId, name: Name) -> CallResult<MethodRef> {
        let own = self
            .meta(owner)
            .methods
            .get_name(name)
            .filter(|method| !method.is_donated())
            .cloned();
        let Some(removed) = own else {
            return Err(errors::method_not_defined_here(
                self.name_str(name),
                &self.display_name(owner),
            ));
        };
        self.meta_mut(owner).methods.remove_name(name);
        self.refresh_donation(owner, name);
        self.propagate(owner, name);
        self.refresh_bridges_for(owner)?;
        Ok(removed)
    }

    /// Toggle the module-function flag of `module`.
    pub fn set_module_function(&mut self, module: MetaId, enabled: bool) -> CallResult<()> {
        if !self.meta(module).is_module() {
            return Err(errors::not_a_module(&self.describe(&Value::Class(module))));
        }
        self.meta_mut(module).module_function = enabled;
        Ok(())
    }

    /// Method names defined on `meta`.
    ///
    /// Without `inherited`, only `meta`'s own definitions; with it, every
    /// name the precedence list answers to, first occurrence first. Undefined
    /// names are never listed.
    pub fn instance_methods(&mut self, meta: MetaId, inherited: bool) -> CallResult<Vec<Name>> {
        if !inherited {
            return Ok(self
                .meta(meta)
                .methods
                .values()
                .filter(|method| !method.is_donated() && !method.is_stub())
                .map(|method| method.name)
                .collect());
        }

        let chain = self.ancestors_of(meta)?;
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for id in chain.iter() {
            for method in self.meta(*id).methods.values() {
                if seen.insert(method.name) && !method.is_stub() {
                    names.push(method.name);
                }
            }
        }
        Ok(names)
    }

    /// Own (non-donated) record for `name` on `owner`.
    pub fn own_method(&self, owner: MetaId, name: Name) -> Option<MethodRef> {
        self.meta(owner)
            .methods
            .get_name(name)
            .filter(|method| !method.is_donated())
            .cloned()
    }
}
