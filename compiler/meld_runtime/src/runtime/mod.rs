//! The runtime context.
//!
//! `Runtime` owns every registry: the metaobject and linkage arenas, constant
//! scopes, the stub registry, native bridges and the ancestry cache. All
//! mutating operations take `&mut Runtime`, so there is exactly one logical
//! caller at a time.
//!
//! # Organisation
//!
//! The operations are split by concern, each file adding an `impl Runtime`
//! block:
//!
//! - `factory`: classes, modules, allocation
//! - `mixin`: inclusion, donation, `extend_object`
//! - `methods`: method definition and removal
//! - `dispatch`: lookup, `dispatch`, `super_dispatch`, hooks
//! - `singleton`: lazy singleton metaobjects
//! - `ancestors`: precedence lists and `is_a`
//! - `constants`: constant get/set with `const_missing`
//! - `stubs`: known message names and native bridges
//! - `hashing`: `KeyOps` for values and the `hash_*` operations
//! - `catch`: non-local exit

mod ancestors;
mod builder;
mod catch;
mod constants;
mod dispatch;
mod factory;
mod hashing;
mod methods;
mod mixin;
mod singleton;
mod stubs;

pub use builder::{RuntimeBuilder, RuntimeConfig, DEFAULT_MAX_CALL_DEPTH};
pub use catch::{escape, Escape, EscapeTag};
pub use dispatch::MethodResolution;
pub use stubs::{BridgeRegistry, StubRegistry};

use std::rc::Rc;

use meld_ir::{Name, SharedInterner};
use rustc_hash::FxHashMap;

use crate::errors::CallResult;
use crate::ids::{IdGen, LinkId, MetaId, ScopeId};
use crate::meta::{Allocator, Attached, LinkageNode, MetaKind, MetaObject, Parent};
use crate::scope::ScopeTree;
use crate::value::{ObjRef, ProcRef, Value};

/// The three metaobjects every runtime boots with.
///
/// `Object` is the root class, `Module < Object` and `Class < Module`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CoreClasses {
    pub object: MetaId,
    pub module: MetaId,
    pub class: MetaId,
}

/// Object-model runtime.
pub struct Runtime {
    interner: SharedInterner,
    ids: IdGen,
    metas: Vec<MetaObject>,
    links: Vec<LinkageNode>,
    scopes: ScopeTree,
    stubs: StubRegistry,
    bridges: BridgeRegistry,
    ancestry: FxHashMap<MetaId, Rc<[MetaId]>>,
    config: RuntimeConfig,
    depth: usize,
    core: CoreClasses,
}

impl Runtime {
    /// Runtime with default configuration and a fresh interner.
    pub fn new() -> Self {
        RuntimeBuilder::new().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Boot the core classes. Called by `RuntimeBuilder::build`.
    fn boot(interner: SharedInterner, config: RuntimeConfig) -> Self {
        // Allocated below in exactly this order.
        let core = CoreClasses {
            object: MetaId::from_len(0),
            module: MetaId::from_len(1),
            class: MetaId::from_len(2),
        };
        let mut rt = Runtime {
            interner,
            ids: IdGen::new(),
            metas: Vec::new(),
            links: Vec::new(),
            scopes: ScopeTree::new(),
            stubs: StubRegistry::default(),
            bridges: BridgeRegistry::default(),
            ancestry: FxHashMap::default(),
            config,
            depth: 0,
            core,
        };

        let object = rt.alloc_meta(MetaKind::Class, None);
        let object_scope = rt.meta(object).scope;
        let module = rt.alloc_meta(MetaKind::Class, Some(object_scope));
        let class = rt.alloc_meta(MetaKind::Class, Some(object_scope));
        debug_assert_eq!((object, module, class), (core.object, core.module, core.class));

        rt.set_superclass(module, object);
        rt.set_superclass(class, module);

        let object_alloc: Allocator = Rc::new(allocate_object);
        let module_alloc: Allocator =
            Rc::new(|rt: &mut Runtime, _: MetaId| -> CallResult { Ok(Value::Class(rt.new_module())) });
        let class_alloc: Allocator =
            Rc::new(|rt: &mut Runtime, _: MetaId| -> CallResult { rt.new_class(None).map(Value::Class) });
        rt.meta_mut(object).allocator = Some(object_alloc);
        rt.meta_mut(module).allocator = Some(module_alloc);
        rt.meta_mut(class).allocator = Some(class_alloc);

        for (id, text) in [(object, "Object"), (module, "Module"), (class, "Class")] {
            let name = rt.intern(text);
            rt.scopes.set(object_scope, name, Value::Class(id));
            let meta = rt.meta_mut(id);
            meta.name = Some(name);
            meta.full_name = Some(text.to_owned());
        }

        tracing::debug!(metas = rt.metas.len(), "runtime booted");
        rt
    }

    // Arena access

    pub fn meta(&self, id: MetaId) -> &MetaObject {
        &self.metas[id.index()]
    }

    pub(crate) fn meta_mut(&mut self, id: MetaId) -> &mut MetaObject {
        &mut self.metas[id.index()]
    }

    pub fn link(&self, id: LinkId) -> &LinkageNode {
        &self.links[id.index()]
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Number of metaobjects, singletons included.
    pub fn meta_count(&self) -> usize {
        self.metas.len()
    }

    pub(crate) fn alloc_meta(&mut self, kind: MetaKind, scope_parent: Option<ScopeId>) -> MetaId {
        let id = MetaId::from_len(self.metas.len());
        let scope = self.scopes.push(Some(id), scope_parent);
        let object_id = self.ids.next_id();
        self.metas.push(MetaObject::new(id, object_id, kind, scope));
        id
    }

    pub(crate) fn alloc_link(&mut self, node: LinkageNode) -> LinkId {
        let id = LinkId::from_len(self.links.len());
        self.links.push(node);
        id
    }

    /// Wire a superclass at creation time. Superclasses never change after.
    pub(crate) fn set_superclass(&mut self, id: MetaId, superclass: MetaId) {
        let meta = self.meta_mut(id);
        meta.superclass = Some(superclass);
        meta.parent = Some(Parent::Meta(superclass));
    }

    // Context

    pub fn core(&self) -> CoreClasses {
        self.core
    }

    pub fn object_class(&self) -> MetaId {
        self.core.object
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn intern(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    pub fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Current method nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn next_id(&mut self) -> u64 {
        self.ids.next_id()
    }

    /// Block value wrapping `body`.
    pub fn new_proc<F>(&mut self, body: F) -> Value
    where
        F: Fn(&mut Runtime, &[Value]) -> CallResult + 'static,
    {
        let id = self.ids.next_id();
        Value::Proc(ProcRef::new(id, Rc::new(body)))
    }

    // Naming

    /// Name shown in messages: the qualified name, or a placeholder for
    /// anonymous metaobjects and singletons.
    pub fn display_name(&self, id: MetaId) -> String {
        let meta = self.meta(id);
        if let Some(full) = &meta.full_name {
            return full.clone();
        }
        match (meta.kind, meta.attached) {
            (MetaKind::Singleton, Some(Attached::Meta(owner))) => {
                format!("#<Class:{}>", self.display_name(owner))
            }
            (MetaKind::Singleton, Some(Attached::Object(object_id))) => {
                let class = meta.superclass.map_or_else(String::new, |c| self.display_name(c));
                format!("#<Class:#<{class}:{object_id}>>")
            }
            (MetaKind::Module, _) => format!("#<Module:{:#x}>", meta.object_id),
            _ => format!("#<Class:{:#x}>", meta.object_id),
        }
    }

    /// Receiver description used in lookup errors.
    pub fn describe(&self, value: &Value) -> String {
        match value {
            Value::Nil => "nil".to_owned(),
            Value::Bool(b) => b.to_string(),
            Value::Class(id) => {
                format!("{} {}", self.meta(*id).kind.label(), self.display_name(*id))
            }
            _ => format!("an instance of {}", self.display_name(self.class_of(value))),
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Root allocator: a plain instance of `class`.
fn allocate_object(rt: &mut Runtime, class: MetaId) -> CallResult {
    let id = rt.ids.next_id();
    Ok(Value::Object(ObjRef::new(id, class)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
