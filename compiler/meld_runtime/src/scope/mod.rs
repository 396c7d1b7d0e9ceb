//! Constant scopes.
//!
//! Every metaobject owns one scope; a scope's parent is the scope of the
//! namespace the metaobject was defined in. Lexical lookup walks parent links
//! only. The ancestor part of constant resolution lives on `Runtime`, which
//! knows about metaobjects.

use meld_ir::Name;

use crate::hash::HashTable;
use crate::ids::{MetaId, ScopeId};
use crate::value::Value;

/// One constant namespace.
#[derive(Debug)]
pub struct Scope {
    owner: Option<MetaId>,
    parent: Option<ScopeId>,
    constants: HashTable<Value>,
}

/// Arena of constant scopes.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope chained to `parent`.
    pub fn push(&mut self, owner: Option<MetaId>, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::from_len(self.scopes.len());
        self.scopes.push(Scope {
            owner,
            parent,
            constants: HashTable::new(),
        });
        id
    }

    pub fn owner(&self, scope: ScopeId) -> Option<MetaId> {
        self.scopes[scope.index()].owner
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.index()].parent
    }

    /// Bind `name` in `scope`, returning the previous binding.
    pub fn set(&mut self, scope: ScopeId, name: Name, value: Value) -> Option<Value> {
        self.scopes[scope.index()].constants.put_name(name, value)
    }

    /// Bind `name` only if `scope` has no binding for it yet.
    pub fn set_if_absent(&mut self, scope: ScopeId, name: Name, value: Value) -> bool {
        let constants = &mut self.scopes[scope.index()].constants;
        if constants.contains_name(name) {
            return false;
        }
        constants.put_name(name, value);
        true
    }

    pub fn get_own(&self, scope: ScopeId, name: Name) -> Option<&Value> {
        self.scopes[scope.index()].constants.get_name(name)
    }

    pub fn contains_own(&self, scope: ScopeId, name: Name) -> bool {
        self.scopes[scope.index()].constants.contains_name(name)
    }

    /// Search `scope` and then its enclosing scopes.
    pub fn lookup_lexical(&self, scope: ScopeId, name: Name) -> Option<(ScopeId, &Value)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(value) = self.get_own(id, name) {
                return Some((id, value));
            }
            current = self.parent(id);
        }
        None
    }

    /// Own constant names in insertion order.
    pub fn names(&self, scope: ScopeId) -> Vec<Name> {
        self.scopes[scope.index()].constants.names().collect()
    }

    /// Own bindings in insertion order.
    pub fn entries(&self, scope: ScopeId) -> Vec<(Name, Value)> {
        self.scopes[scope.index()]
            .constants
            .iter()
            .filter_map(|(key, value)| match key {
                Value::Symbol(name) => Some((*name, value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
