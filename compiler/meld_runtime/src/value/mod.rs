//! Runtime values.
//!
//! Values are cheap to clone: heap kinds share their payload through `Rc`, so
//! a clone is another reference to the same array, hash or instance. Object
//! identity is pointer identity of the shared payload.
//!
//! Everything except [`Value::Object`] and [`Value::Class`] is a *native kind*:
//! its behaviour lives outside the metaobject graph, and it only takes part in
//! dispatch once bridged to a class (see `Runtime::bridge_native_type`).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use meld_ir::Name;
use rustc_hash::FxHashMap;

use crate::errors::CallResult;
use crate::hash::HashTable;
use crate::ids::MetaId;
use crate::runtime::Runtime;

/// Shared, mutable array payload.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable hash payload.
pub type HashRef = Rc<RefCell<HashTable<Value>>>;

/// Value kinds implemented outside the metaobject graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Symbol,
    Array,
    Hash,
    Proc,
}

impl NativeKind {
    /// Name used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            NativeKind::Nil => "nil",
            NativeKind::Bool => "bool",
            NativeKind::Int => "int",
            NativeKind::Float => "float",
            NativeKind::Str => "str",
            NativeKind::Symbol => "symbol",
            NativeKind::Array => "array",
            NativeKind::Hash => "hash",
            NativeKind::Proc => "proc",
        }
    }
}

/// Runtime value.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Symbol(Name),
    Array(ArrayRef),
    Hash(HashRef),
    /// Instance of a user-visible class.
    Object(ObjRef),
    /// A class, module or singleton used as a value.
    Class(MetaId),
    /// Callable block.
    Proc(ProcRef),
}

impl Value {
    #[inline]
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    #[inline]
    pub fn symbol(name: Name) -> Self {
        Value::Symbol(name)
    }

    #[inline]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    #[inline]
    pub fn hash(table: HashTable<Value>) -> Self {
        Value::Hash(Rc::new(RefCell::new(table)))
    }

    /// The native kind of this value, or `None` for objects and metaobjects.
    pub fn native_kind(&self) -> Option<NativeKind> {
        match self {
            Value::Nil => Some(NativeKind::Nil),
            Value::Bool(_) => Some(NativeKind::Bool),
            Value::Int(_) => Some(NativeKind::Int),
            Value::Float(_) => Some(NativeKind::Float),
            Value::Str(_) => Some(NativeKind::Str),
            Value::Symbol(_) => Some(NativeKind::Symbol),
            Value::Array(_) => Some(NativeKind::Array),
            Value::Hash(_) => Some(NativeKind::Hash),
            Value::Proc(_) => Some(NativeKind::Proc),
            Value::Object(_) | Value::Class(_) => None,
        }
    }

    /// Only `nil` and `false` are falsy.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_meta(&self) -> Option<MetaId> {
        match self {
            Value::Class(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Identity comparison: same immediate, or same shared payload.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Proc(a), Value::Proc(b)) => a.id == b.id,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

/// Structural equality for immediates and arrays; identity for everything
/// with user-definable behaviour.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Proc(a), Value::Proc(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Symbol(name) => write!(f, ":{}", name.raw()),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Hash(table) => write!(f, "<hash len={}>", table.borrow().len()),
            Value::Object(obj) => write!(f, "<object {} of {:?}>", obj.id(), obj.class()),
            Value::Class(id) => write!(f, "<meta {}>", id.raw()),
            Value::Proc(p) => write!(f, "<proc {}>", p.id),
        }
    }
}

/// Shared instance payload.
pub struct Instance {
    id: u64,
    class: MetaId,
    singleton: Cell<Option<MetaId>>,
    ivars: RefCell<FxHashMap<Name, Value>>,
}

/// Reference to an instance; clones share identity.
#[derive(Clone)]
pub struct ObjRef(Rc<Instance>);

impl ObjRef {
    pub(crate) fn new(id: u64, class: MetaId) -> Self {
        ObjRef(Rc::new(Instance {
            id,
            class,
            singleton: Cell::new(None),
            ivars: RefCell::new(FxHashMap::default()),
        }))
    }

    /// Unique object id.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Class the instance was allocated from (never a singleton).
    pub fn class(&self) -> MetaId {
        self.0.class
    }

    /// Cached singleton, if one has been built.
    pub fn singleton(&self) -> Option<MetaId> {
        self.0.singleton.get()
    }

    pub(crate) fn set_singleton(&self, singleton: MetaId) {
        self.0.singleton.set(Some(singleton));
    }

    pub fn ivar_get(&self, name: Name) -> Value {
        self.0.ivars.borrow().get(&name).cloned().unwrap_or(Value::Nil)
    }

    pub fn ivar_set(&self, name: Name, value: Value) {
        self.0.ivars.borrow_mut().insert(name, value);
    }

    pub fn ptr_eq(&self, other: &ObjRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Body of a block value.
pub type ProcFn = Rc<dyn Fn(&mut Runtime, &[Value]) -> CallResult>;

/// Callable block; identity is its id.
#[derive(Clone)]
pub struct ProcRef {
    pub(crate) id: u64,
    body: ProcFn,
}

impl ProcRef {
    pub(crate) fn new(id: u64, body: ProcFn) -> Self {
        ProcRef { id, body }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Run the block.
    pub fn call(&self, rt: &mut Runtime, args: &[Value]) -> CallResult {
        let body = Rc::clone(&self.body);
        body(rt, args)
    }
}
