//! Metaobjects and linkage nodes.
//!
//! Both live in arenas on `Runtime`. A metaobject's `parent` is the head of
//! its ancestor chain: it starts at the superclass and is replaced by a new
//! linkage node on every inclusion. Each linkage node remembers the parent it
//! displaced, so the chain reads most-recent mixin first, superclass last.

use std::fmt;
use std::rc::Rc;

use meld_ir::Name;
use smallvec::SmallVec;

use crate::errors::CallResult;
use crate::hash::HashTable;
use crate::ids::{LinkId, MetaId, ScopeId};
use crate::method::MethodRef;
use crate::runtime::Runtime;

/// Instance allocator. Receives the class being instantiated.
pub type Allocator = Rc<dyn Fn(&mut Runtime, MetaId) -> CallResult>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MetaKind {
    Class,
    Module,
    Singleton,
}

impl MetaKind {
    pub fn label(self) -> &'static str {
        match self {
            MetaKind::Class | MetaKind::Singleton => "class",
            MetaKind::Module => "module",
        }
    }
}

/// Next entry of an ancestor chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parent {
    /// Superclass; the chain continues in its own parent.
    Meta(MetaId),
    Link(LinkId),
}

/// Synthetic chain entry created by one inclusion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkageNode {
    pub module: MetaId,
    /// Parent displaced when this node was inserted.
    pub parent: Option<Parent>,
}

/// What a singleton is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Attached {
    Meta(MetaId),
    /// Object id of a plain instance.
    Object(u64),
}

/// A class, module or singleton.
pub struct MetaObject {
    pub(crate) id: MetaId,
    pub(crate) object_id: u64,
    pub(crate) name: Option<Name>,
    pub(crate) full_name: Option<String>,
    pub(crate) kind: MetaKind,
    pub(crate) superclass: Option<MetaId>,
    pub(crate) parent: Option<Parent>,
    /// Direct mixins in inclusion order.
    pub(crate) mixins: SmallVec<[MetaId; 4]>,
    /// Metaobjects that included this one.
    pub(crate) dependents: Vec<MetaId>,
    pub(crate) scope: ScopeId,
    pub(crate) methods: HashTable<MethodRef>,
    pub(crate) allocator: Option<Allocator>,
    pub(crate) module_function: bool,
    pub(crate) singleton: Option<MetaId>,
    pub(crate) attached: Option<Attached>,
}

impl MetaObject {
    pub(crate) fn new(id: MetaId, object_id: u64, kind: MetaKind, scope: ScopeId) -> Self {
        MetaObject {
            id,
            object_id,
            name: None,
            full_name: None,
            kind,
            superclass: None,
            parent: None,
            mixins: SmallVec::new(),
            dependents: Vec::new(),
            scope,
            methods: HashTable::new(),
            allocator: None,
            module_function: false,
            singleton: None,
            attached: None,
        }
    }

    pub fn id(&self) -> MetaId {
        self.id
    }

    pub fn object_id(&self) -> u64 {
        self.object_id
    }

    pub fn kind(&self) -> MetaKind {
        self.kind
    }

    /// Constant name this metaobject was bound to first; `None` while anonymous.
    pub fn name(&self) -> Option<Name> {
        self.name
    }

    /// Qualified name such as `Outer::Inner`.
    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    pub fn superclass(&self) -> Option<MetaId> {
        self.superclass
    }

    pub fn mixins(&self) -> &[MetaId] {
        &self.mixins
    }

    pub fn dependents(&self) -> &[MetaId] {
        &self.dependents
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn methods(&self) -> &HashTable<MethodRef> {
        &self.methods
    }

    pub fn singleton(&self) -> Option<MetaId> {
        self.singleton
    }

    pub fn attached(&self) -> Option<Attached> {
        self.attached
    }

    pub fn is_class(&self) -> bool {
        self.kind == MetaKind::Class
    }

    pub fn is_module(&self) -> bool {
        self.kind == MetaKind::Module
    }

    pub fn is_singleton(&self) -> bool {
        self.kind == MetaKind::Singleton
    }

    pub fn module_function(&self) -> bool {
        self.module_function
    }

    /// Position of `module` among the direct mixins.
    pub(crate) fn mixin_position(&self, module: MetaId) -> Option<usize> {
        self.mixins.iter().position(|m| *m == module)
    }
}

impl fmt::Debug for MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaObject")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("parent", &self.parent)
            .field("mixins", &self.mixins)
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}
