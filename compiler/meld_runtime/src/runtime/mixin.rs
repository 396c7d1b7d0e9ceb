//! Module inclusion and method donation.
//!
//! Including `M` into `C` inserts a linkage node at the head of `C`'s parent
//! chain and copies `M`'s methods into `C`'s table, tagged with `M` as donor.
//! Donated entries are recomputed, never merged: for a name `C` does not define
//! itself, the entry is the copy from the most recently included mixin that
//! has the name, or nothing. Every later change to a module's table re-runs
//! that computation on its dependents, and on theirs in turn when they are
//! modules.

use std::rc::Rc;

use meld_ir::{well_known, Name};

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::ids::MetaId;
use crate::meta::{LinkageNode, Parent};
use crate::value::Value;

impl Runtime {
    /// Include `module` into `into`, then fire `module`'s `included` hook.
    ///
    /// Including a module that is already a direct mixin is a no-op.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(module = %self.display_name(module), into = %self.display_name(into))
    )]
    pub fn include_module(&mut self, module: MetaId, into: MetaId) -> CallResult<()> {
        if self.append_mixin(module, into)? {
            self.call_hook(
                &Value::Class(module),
                well_known::INCLUDED,
                &[Value::Class(into)],
            )?;
        }
        Ok(())
    }

    /// Include `module` into the singleton of `target`, then fire `module`'s
    /// `extended` hook.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %self.display_name(module)))]
    pub fn extend_object(&mut self, target: &Value, module: MetaId) -> CallResult<()> {
        if !self.meta(module).is_module() {
            return Err(errors::not_a_module(&self.describe(&Value::Class(module))));
        }
        let singleton = self.singleton_of(target)?;
        if self.append_mixin(module, singleton)? {
            self.call_hook(
                &Value::Class(module),
                well_known::EXTENDED,
                &[target.clone()],
            )?;
        }
        Ok(())
    }

    /// Link, donate and propagate. Returns `false` for the no-op case.
    fn append_mixin(&mut self, module: MetaId, into: MetaId) -> CallResult<bool> {
        if !self.meta(module).is_module() {
            return Err(errors::not_a_module(&self.describe(&Value::Class(module))));
        }
        if self.meta(into).mixin_position(module).is_some() {
            tracing::trace!("already included");
            return Ok(false);
        }
        if module == into || self.ancestors_of(module)?.contains(&into) {
            return Err(errors::cyclic_include(
                &self.display_name(module),
                &self.display_name(into),
            ));
        }

        let displaced = self.meta(into).parent;
        let link = self.alloc_link(LinkageNode {
            module,
            parent: displaced,
        });
        let target = self.meta_mut(into);
        target.parent = Some(Parent::Link(link));
        target.mixins.push(module);
        self.meta_mut(module).dependents.push(into);
        self.invalidate_ancestry();

        let names: Vec<Name> = self.meta(module).methods.names().collect();
        for name in names {
            if self.refresh_donation(into, name) {
                self.propagate(into, name);
            }
        }

        let module_scope = self.meta(module).scope;
        let into_scope = self.meta(into).scope;
        for (name, value) in self.scopes.entries(module_scope) {
            self.scopes.set_if_absent(into_scope, name, value);
        }

        self.refresh_bridges_for(into)?;
        Ok(true)
    }

    /// Recompute `target`'s entry for `name` from its mixins.
    ///
    /// Own definitions are left alone. Returns whether the entry changed.
    pub(crate) fn refresh_donation(&mut self, target: MetaId, name: Name) -> bool {
        let current = self.meta(target).methods.get_name(name).cloned();
        if current.as_ref().is_some_and(|method| !method.is_donated()) {
            return false;
        }

        let meta = self.meta(target);
        let candidate = meta.mixins.iter().rev().find_map(|&mixin| {
            self.meta(mixin)
                .methods
                .get_name(name)
                .map(|method| (mixin, Rc::clone(method)))
        });

        match (candidate, current) {
            (Some((donor, method)), current) => {
                if current.is_some_and(|c| c.id == method.id && c.donor == Some(donor)) {
                    return false;
                }
                tracing::trace!(
                    method = self.name_str(name),
                    donor = %self.display_name(donor),
                    target = %self.display_name(target),
                    "donated"
                );
                let copy = Rc::new(method.donated_by(donor));
                self.meta_mut(target).methods.put_name(name, copy);
                true
            }
            (None, Some(_)) => {
                self.meta_mut(target).methods.remove_name(name);
                true
            }
            (None, None) => false,
        }
    }

    /// Re-run donation of `name` on everything downstream of `source`.
    pub(crate) fn propagate(&mut self, source: MetaId, name: Name) {
        let mut work = vec![source];
        while let Some(module) = work.pop() {
            let dependents = self.meta(module).dependents.clone();
            for dependent in dependents {
                if self.refresh_donation(dependent, name) {
                    work.push(dependent);
                }
            }
        }
    }
}
