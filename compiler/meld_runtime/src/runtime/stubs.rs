//! Known message names and native-type bridges.
//!
//! The stub registry remembers every message name the runtime has seen, so a
//! miss on any receiver can tell "known but not understood here" apart from
//! a name nothing ever defined. Both go to the not-understood path.
//!
//! A bridge lets a native kind (ints, strings, arrays, ...) answer messages
//! through an ordinary class. The class's precedence list is flattened into
//! one table when bridged and rebuilt whenever a method or mixin changes
//! anywhere in that list.

use std::rc::Rc;

use meld_ir::Name;
use rustc_hash::{FxHashMap, FxHashSet};

use super::Runtime;
use crate::errors::{self, CallResult};
use crate::hash::HashTable;
use crate::ids::MetaId;
use crate::method::MethodRef;
use crate::value::NativeKind;

/// Every registered message name, in registration order.
#[derive(Debug, Default)]
pub struct StubRegistry {
    known: FxHashSet<Name>,
    order: Vec<Name>,
}

impl StubRegistry {
    /// Remember `name`. Returns `false` if it was already known.
    pub fn register(&mut self, name: Name) -> bool {
        if self.known.insert(name) {
            self.order.push(name);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, name: Name) -> bool {
        self.known.contains(&name)
    }

    pub fn names(&self) -> &[Name] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug)]
struct Bridge {
    class: MetaId,
    table: HashTable<MethodRef>,
}

/// Native kinds bridged to classes.
#[derive(Debug, Default)]
pub struct BridgeRegistry {
    bridges: FxHashMap<NativeKind, Bridge>,
}

impl BridgeRegistry {
    /// Class `kind` is bridged to.
    pub fn class_for(&self, kind: NativeKind) -> Option<MetaId> {
        self.bridges.get(&kind).map(|bridge| bridge.class)
    }

    pub(crate) fn lookup(&self, kind: NativeKind, name: Name) -> Option<&MethodRef> {
        self.bridges.get(&kind)?.table.get_name(name)
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

impl Runtime {
    /// Remember `name` as a known message.
    pub fn register_stub(&mut self, name: Name) {
        if self.stubs.register(name) {
            tracing::trace!(method = self.name_str(name), "stub registered");
        }
    }

    /// Registered message names in registration order.
    pub fn known_stubs(&self) -> &[Name] {
        self.stubs.names()
    }

    pub fn bridges(&self) -> &BridgeRegistry {
        &self.bridges
    }

    /// Let values of `kind` dispatch through `class`.
    #[tracing::instrument(level = "debug", skip_all, fields(kind = kind.label(), class = %self.display_name(class)))]
    pub fn bridge_native_type(&mut self, kind: NativeKind, class: MetaId) -> CallResult<()> {
        if self.bridges.class_for(kind).is_some() {
            return Err(errors::duplicate_bridge(kind.label()));
        }
        if !self.meta(class).is_class() {
            return Err(errors::not_a_class(&self.display_name(class)));
        }
        let table = self.flatten_methods(class)?;
        self.bridges.bridges.insert(kind, Bridge { class, table });
        Ok(())
    }

    /// First record for every name along `class`'s precedence list.
    fn flatten_methods(&mut self, class: MetaId) -> CallResult<HashTable<MethodRef>> {
        let chain = self.ancestors_of(class)?;
        let mut table = HashTable::new();
        for id in chain.iter() {
            for method in self.meta(*id).methods.values() {
                if !table.contains_name(method.name) {
                    table.put_name(method.name, Rc::clone(method));
                }
            }
        }
        Ok(table)
    }

    /// Rebuild every bridge whose class has `changed` in its precedence list.
    pub(crate) fn refresh_bridges_for(&mut self, changed: MetaId) -> CallResult<()> {
        if self.bridges.is_empty() {
            return Ok(());
        }
        let bridged: Vec<(NativeKind, MetaId)> = self
            .bridges
            .bridges
            .iter()
            .map(|(kind, bridge)| (*kind, bridge.class))
            .collect();
        for (kind, class) in bridged {
            if !self.ancestors_of(class)?.contains(&changed) {
                continue;
            }
            let table = self.flatten_methods(class)?;
            if let Some(bridge) = self.bridges.bridges.get_mut(&kind) {
                bridge.table = table;
            }
            tracing::trace!(kind = kind.label(), "bridge refreshed");
        }
        Ok(())
    }
}
