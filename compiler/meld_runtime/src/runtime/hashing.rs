//! Key hashing and equality for values, and the `hash_*` operations on
//! `Value::Hash`.
//!
//! Native kinds hash structurally. Objects use their class's `hash` and
//! `eql?` methods when they define them, identity otherwise.
//!
//! Arrays that contain themselves hash to a fixed code at the point of
//! recursion, and a pair of arrays already being compared counts as equal.
//!
//! The hash operations never hold a borrow of the table while user code
//! runs: candidates are copied out, compared, and the table is borrowed
//! mutably only for the final store. The table's generation is recorded
//! before user code runs; if a `hash`/`eql?` method appends to or deletes
//! from the hash it is being looked up in, the located slot is stale and
//! the operation raises instead of writing through it.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use meld_ir::well_known;
use rustc_hash::{FxHashSet, FxHasher};

use super::{MethodResolution, Runtime};
use crate::errors::{self, CallResult};
use crate::hash::{FastKey, KeyOps, RehashPlan, Slot};
use crate::stack::ensure_sufficient_stack;
use crate::value::{ArrayRef, HashRef, Value};

/// Hash code of an array reached again while it is being hashed.
const RECURSIVE_ARRAY_HASH: i64 = 0x6d65_6c64_0000_0006;

/// Arrays currently being hashed.
type HashingArrays = FxHashSet<*const ()>;

/// Array pairs currently being compared.
type ComparingArrays = FxHashSet<(*const (), *const ())>;

fn array_ptr(items: &ArrayRef) -> *const () {
    Rc::as_ptr(items).cast()
}

impl KeyOps for Runtime {
    fn hash_key(&mut self, key: &Value) -> CallResult<i64> {
        let mut active = HashingArrays::default();
        self.value_hash(key, &mut active)
    }

    fn keys_eql(&mut self, stored: &Value, probe: &Value) -> CallResult<bool> {
        let mut active = ComparingArrays::default();
        self.value_eql(stored, probe, &mut active)
    }
}

impl Runtime {
    fn value_hash(&mut self, key: &Value, active: &mut HashingArrays) -> CallResult<i64> {
        let mut hasher = FxHasher::default();
        match key {
            Value::Nil => 0u8.hash(&mut hasher),
            Value::Bool(b) => (1u8, *b).hash(&mut hasher),
            Value::Int(n) => (2u8, *n).hash(&mut hasher),
            Value::Float(x) => (3u8, x.to_bits()).hash(&mut hasher),
            Value::Str(s) => (4u8, &**s).hash(&mut hasher),
            Value::Symbol(name) => (5u8, name.raw()).hash(&mut hasher),
            Value::Array(items) => {
                let ptr = array_ptr(items);
                if !active.insert(ptr) {
                    return Ok(RECURSIVE_ARRAY_HASH);
                }
                6u8.hash(&mut hasher);
                let items = items.borrow().clone();
                for item in &items {
                    ensure_sufficient_stack(|| self.value_hash(item, active))?.hash(&mut hasher);
                }
                active.remove(&ptr);
            }
            Value::Hash(table) => (7u8, Rc::as_ptr(table)).hash(&mut hasher),
            Value::Class(id) => (8u8, id.raw()).hash(&mut hasher),
            Value::Proc(proc_ref) => (9u8, proc_ref.id()).hash(&mut hasher),
            Value::Object(obj) => {
                if let MethodResolution::Found(method) = self.resolve(key, well_known::HASH)? {
                    return match self.invoke(key, &method, &[], None)? {
                        Value::Int(code) => Ok(code),
                        _ => Err(errors::invalid_hash_code(
                            &self.display_name(obj.class()),
                        )),
                    };
                }
                (10u8, obj.id()).hash(&mut hasher);
            }
        }
        Ok(i64::from_ne_bytes(hasher.finish().to_ne_bytes()))
    }

    fn value_eql(
        &mut self,
        stored: &Value,
        probe: &Value,
        active: &mut ComparingArrays,
    ) -> CallResult<bool> {
        match (stored, probe) {
            (Value::Object(_), _) => self.user_eql(stored, probe),
            (_, Value::Object(_)) => self.user_eql(probe, stored),
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let pair = (array_ptr(a), array_ptr(b));
                if !active.insert(pair) {
                    return Ok(true);
                }
                let (a, b) = (a.borrow().clone(), b.borrow().clone());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(&b) {
                    if !ensure_sufficient_stack(|| self.value_eql(x, y, active))? {
                        return Ok(false);
                    }
                }
                active.remove(&pair);
                Ok(true)
            }
            (Value::Float(a), Value::Float(b)) => Ok(a.to_bits() == b.to_bits()),
            _ => Ok(stored == probe),
        }
    }

    /// `eql?` on an object, identity when the class does not define it.
    fn user_eql(&mut self, object: &Value, other: &Value) -> CallResult<bool> {
        match self.resolve(object, well_known::EQL)? {
            MethodResolution::Found(method) => Ok(self
                .invoke(object, &method, std::slice::from_ref(other), None)?
                .is_truthy()),
            MethodResolution::Undefined | MethodResolution::NotFound => {
                Ok(object.identical(other))
            }
        }
    }

    fn hash_ref(&self, hash: &Value) -> CallResult<HashRef> {
        match hash {
            Value::Hash(table) => Ok(Rc::clone(table)),
            other => Err(errors::not_a_hash(&self.describe(other))),
        }
    }

    /// Locate `key`, returning the slot and the generation it is valid for.
    fn locate_in(&mut self, table: &HashRef, key: &Value) -> CallResult<(Slot, u64)> {
        if let Some(fast) = FastKey::of(key) {
            let guard = table.try_borrow().map_err(|_| errors::hash_in_use())?;
            return Ok((guard.locate_fast(fast), guard.generation()));
        }
        let hash = self.hash_key(key)?;
        let (candidates, generation) = {
            let guard = table.try_borrow().map_err(|_| errors::hash_in_use())?;
            (guard.candidates(hash), guard.generation())
        };
        for (index, stored) in candidates {
            if self.keys_eql(&stored, key)? {
                let slot = Slot::Slow {
                    hash,
                    index: Some(index),
                };
                return Ok((slot, generation));
            }
        }
        Ok((Slot::Slow { hash, index: None }, generation))
    }

    /// Store `value` under `key`, returning the replaced value.
    pub fn hash_put(&mut self, hash: &Value, key: Value, value: Value) -> CallResult<Option<Value>> {
        let table = self.hash_ref(hash)?;
        let (slot, generation) = self.locate_in(&table, &key)?;
        let mut guard = table.try_borrow_mut().map_err(|_| errors::hash_in_use())?;
        if guard.generation() != generation {
            return Err(errors::hash_in_use());
        }
        Ok(guard.store(slot, key, value))
    }

    /// Value stored under `key`; `None` when absent.
    pub fn hash_get(&mut self, hash: &Value, key: &Value) -> CallResult<Option<Value>> {
        let table = self.hash_ref(hash)?;
        let (slot, generation) = self.locate_in(&table, key)?;
        let Some(index) = slot.index() else {
            return Ok(None);
        };
        let guard = table.try_borrow().map_err(|_| errors::hash_in_use())?;
        if guard.generation() != generation {
            return Err(errors::hash_in_use());
        }
        Ok(guard.value_at(index).cloned())
    }

    /// Remove `key`, returning its value.
    pub fn hash_delete(&mut self, hash: &Value, key: &Value) -> CallResult<Option<Value>> {
        let table = self.hash_ref(hash)?;
        let (slot, generation) = self.locate_in(&table, key)?;
        if !slot.is_found() {
            return Ok(None);
        }
        let mut guard = table.try_borrow_mut().map_err(|_| errors::hash_in_use())?;
        if guard.generation() != generation {
            return Err(errors::hash_in_use());
        }
        Ok(guard.take(&slot).map(|(_, value)| value))
    }

    /// Call `f` on each entry in insertion order.
    ///
    /// Iterates a snapshot, so `f` may modify the hash. An `Err` from `f`
    /// (an error or an escape) stops the iteration.
    pub fn hash_each<F>(&mut self, hash: &Value, mut f: F) -> CallResult<()>
    where
        F: FnMut(&mut Runtime, &Value, &Value) -> CallResult<()>,
    {
        let table = self.hash_ref(hash)?;
        let entries: Vec<(Value, Value)> = table
            .try_borrow()
            .map_err(|_| errors::hash_in_use())?
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for (key, value) in &entries {
            f(self, key, value)?;
        }
        Ok(())
    }

    /// Recompute hash codes of keys whose hash may have changed.
    pub fn hash_rehash(&mut self, hash: &Value) -> CallResult<()> {
        let table = self.hash_ref(hash)?;
        let (keys, generation) = {
            let guard = table.try_borrow().map_err(|_| errors::hash_in_use())?;
            (guard.live_keys(), guard.generation())
        };
        let plan = RehashPlan::build(self, &keys)?;
        if !plan.dropped().is_empty() {
            tracing::debug!(dropped = plan.dropped().len(), "rehash collapsed keys");
        }
        let mut guard = table.try_borrow_mut().map_err(|_| errors::hash_in_use())?;
        if guard.generation() != generation {
            return Err(errors::hash_in_use());
        }
        guard.apply_rehash(&plan);
        Ok(())
    }

    /// Number of entries in a hash value.
    pub fn hash_len(&self, hash: &Value) -> CallResult<usize> {
        let table = self.hash_ref(hash)?;
        let len = table.try_borrow().map_err(|_| errors::hash_in_use())?.len();
        Ok(len)
    }
}
