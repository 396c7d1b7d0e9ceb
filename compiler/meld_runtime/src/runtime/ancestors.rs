//! Ancestor precedence lists.
//!
//! `ancestors_of(meta)` is `meta`, then each mixin chain (most recent first,
//! each expanded recursively), then the superclass's own list. A module that
//! has already been emitted is skipped. Lists are cached per metaobject and
//! the whole cache is dropped on any composition change.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::ids::MetaId;
use crate::meta::Parent;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

struct Walk {
    out: Vec<MetaId>,
    emitted: FxHashSet<MetaId>,
    active: FxHashSet<MetaId>,
}

impl Runtime {
    /// Full precedence list of `meta`, starting with `meta` itself.
    pub fn ancestors_of(&mut self, meta: MetaId) -> CallResult<Rc<[MetaId]>> {
        if let Some(cached) = self.ancestry.get(&meta) {
            return Ok(Rc::clone(cached));
        }
        let mut walk = Walk {
            out: Vec::new(),
            emitted: FxHashSet::default(),
            active: FxHashSet::default(),
        };
        self.expand(meta, &mut walk)?;
        let list: Rc<[MetaId]> = walk.out.into();
        self.ancestry.insert(meta, Rc::clone(&list));
        Ok(list)
    }

    fn expand(&self, meta: MetaId, walk: &mut Walk) -> CallResult<()> {
        if !walk.active.insert(meta) {
            return Err(errors::ancestor_cycle(&self.display_name(meta)));
        }
        walk.emitted.insert(meta);
        walk.out.push(meta);

        let mut parent = self.meta(meta).parent;
        while let Some(next) = parent {
            match next {
                Parent::Link(link) => {
                    let node = *self.link(link);
                    if walk.active.contains(&node.module) {
                        return Err(errors::ancestor_cycle(&self.display_name(node.module)));
                    }
                    if !walk.emitted.contains(&node.module) {
                        ensure_sufficient_stack(|| self.expand(node.module, walk))?;
                    }
                    parent = node.parent;
                }
                Parent::Meta(superclass) => {
                    ensure_sufficient_stack(|| self.expand(superclass, walk))?;
                    break;
                }
            }
        }

        walk.active.remove(&meta);
        Ok(())
    }

    /// Drop every cached precedence list.
    pub(crate) fn invalidate_ancestry(&mut self) {
        if !self.ancestry.is_empty() {
            tracing::trace!(entries = self.ancestry.len(), "ancestry cache cleared");
            self.ancestry.clear();
        }
    }

    /// Whether `ancestor` appears in the precedence list of `meta`.
    pub fn inherits_from(&mut self, meta: MetaId, ancestor: MetaId) -> CallResult<bool> {
        Ok(self.ancestors_of(meta)?.contains(&ancestor))
    }

    /// Type test: is `value` an instance of `meta` or of something that
    /// includes or inherits from it.
    pub fn is_a(&mut self, value: &Value, meta: MetaId) -> CallResult<bool> {
        let start = self.dispatch_meta(value)?;
        self.inherits_from(start, meta)
    }

    /// Modules in the precedence list of `meta`, in order.
    pub fn included_modules(&mut self, meta: MetaId) -> CallResult<Vec<MetaId>> {
        let list = self.ancestors_of(meta)?;
        Ok(list
            .iter()
            .copied()
            .filter(|id| *id != meta && self.meta(*id).is_module())
            .collect())
    }

    /// Whether `module` is mixed in anywhere in `meta`'s precedence list.
    pub fn include_p(&mut self, meta: MetaId, module: MetaId) -> CallResult<bool> {
        if !self.meta(module).is_module() || meta == module {
            return Ok(false);
        }
        self.inherits_from(meta, module)
    }

    /// Superclass chain of `meta` without mixins.
    pub fn superclass_chain(&self, meta: MetaId) -> Vec<MetaId> {
        let mut chain = vec![meta];
        let mut current = self.meta(meta).superclass;
        while let Some(id) = current {
            chain.push(id);
            current = self.meta(id).superclass;
        }
        chain
    }
}
