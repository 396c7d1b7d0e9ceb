//! Constant resolution.
//!
//! Lookup order: `base`'s own scope and its enclosing scopes, then the scopes
//! of `base`'s ancestors, then `const_missing` on `base`.

use meld_ir::{well_known, Name};

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::ids::MetaId;
use crate::value::Value;

impl Runtime {
    /// Bind `name` in `base`. An anonymous class or module takes the name.
    pub fn const_set(&mut self, base: MetaId, name: Name, value: Value) -> Option<Value> {
        if let Some(id) = value.as_meta() {
            let meta = self.meta(id);
            if meta.full_name.is_none() && !meta.is_singleton() {
                let full = self.qualified_name(base, name);
                let meta = self.meta_mut(id);
                meta.name = Some(name);
                meta.full_name = Some(full);
            }
        }
        let scope = self.meta(base).scope;
        tracing::trace!(constant = self.name_str(name), "constant set");
        self.scopes.set(scope, name, value)
    }

    /// Resolve `name` from `base`, falling back to `const_missing`.
    pub fn const_get(&mut self, base: MetaId, name: Name) -> CallResult {
        if let Some(value) = self.find_constant(base, name)? {
            return Ok(value);
        }
        let hook_args = [Value::Symbol(name)];
        if let Some(value) = self.call_hook(&Value::Class(base), well_known::CONST_MISSING, &hook_args)? {
            return Ok(value);
        }
        Err(errors::uninitialized_constant(self.qualified_name(base, name)))
    }

    /// Whether `name` resolves from `base` without `const_missing`.
    pub fn const_defined(&mut self, base: MetaId, name: Name) -> CallResult<bool> {
        Ok(self.find_constant(base, name)?.is_some())
    }

    /// Own constant names of `base`, in definition order.
    pub fn constants(&self, base: MetaId) -> Vec<Name> {
        self.scopes.names(self.meta(base).scope)
    }

    fn find_constant(&mut self, base: MetaId, name: Name) -> CallResult<Option<Value>> {
        let scope = self.meta(base).scope;
        if let Some((_, value)) = self.scopes.lookup_lexical(scope, name) {
            return Ok(Some(value.clone()));
        }
        let chain = self.ancestors_of(base)?;
        Ok(chain
            .iter()
            .find_map(|id| self.scopes.get_own(self.meta(*id).scope, name))
            .cloned())
    }
}
