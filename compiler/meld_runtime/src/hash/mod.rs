//! Ordered hash table.
//!
//! Entries live in insertion order in `entries`; deleted entries leave a
//! tombstone so positions stay stable until the next compaction. Two indexes
//! point into `entries`:
//!
//! - `fast`: strings and symbols, keyed directly by content/identity.
//! - `buckets`: every other key, grouped by a hash code from [`KeyOps`].
//!   Keys in the same bucket are told apart by `KeyOps::keys_eql`.
//!
//! Lookup is split into [`HashTable::locate`] (read-only, may call back into
//! user code through `KeyOps`) and [`HashTable::store`]/[`HashTable::take`]
//! (mutating, never calls out). Callers that keep the table behind a `RefCell`
//! use the finer-grained [`HashTable::candidates`] so no borrow is held while
//! user code runs.

use std::fmt;
use std::rc::Rc;

use meld_ir::Name;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::CallResult;
use crate::value::Value;

/// Compaction never runs below this many slots.
const COMPACT_MIN_SLOTS: usize = 16;

/// Hashing and equality for keys outside the fast path.
pub trait KeyOps {
    /// Hash code for `key`.
    fn hash_key(&mut self, key: &Value) -> CallResult<i64>;

    /// Whether `probe` names the same entry as the stored key.
    fn keys_eql(&mut self, stored: &Value, probe: &Value) -> CallResult<bool>;
}

/// Key handled without calling `KeyOps`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FastKey {
    Str(Rc<str>),
    Sym(Name),
}

impl FastKey {
    /// Fast-path form of `key`, if it has one.
    pub fn of(key: &Value) -> Option<FastKey> {
        match key {
            Value::Str(s) => Some(FastKey::Str(Rc::clone(s))),
            Value::Symbol(name) => Some(FastKey::Sym(*name)),
            _ => None,
        }
    }
}

/// Where a key lives, or would live, in a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    Fast(FastKey, Option<usize>),
    Slow { hash: i64, index: Option<usize> },
}

impl Slot {
    /// Entry index when the key is present.
    pub fn index(&self) -> Option<usize> {
        match self {
            Slot::Fast(_, index) | Slot::Slow { index, .. } => *index,
        }
    }

    #[inline]
    pub fn is_found(&self) -> bool {
        self.index().is_some()
    }
}

#[derive(Clone)]
struct Entry<V> {
    key: Value,
    value: V,
    /// `None` for fast-path keys.
    hash: Option<i64>,
}

/// Insertion-ordered map from [`Value`] keys to `V`.
#[derive(Clone)]
pub struct HashTable<V = Value> {
    entries: Vec<Option<Entry<V>>>,
    fast: FxHashMap<FastKey, usize>,
    buckets: FxHashMap<i64, SmallVec<[usize; 2]>>,
    live: usize,
    /// Bumped whenever entry indices may change meaning.
    generation: u64,
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        HashTable {
            entries: Vec::new(),
            fast: FxHashMap::default(),
            buckets: FxHashMap::default(),
            live: 0,
            generation: 0,
        }
    }
}

impl<V> HashTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Changes whenever an entry is appended or removed, or the table is
    /// compacted. A [`Slot`] is only valid for the generation it was
    /// located in.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.fast.clear();
        self.buckets.clear();
        self.live = 0;
        self.bump();
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &V)> {
        self.entries
            .iter()
            .flatten()
            .map(|entry| (&entry.key, &entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Find where `key` lives. Calls `ops` only for keys outside the fast path.
    pub fn locate<O: KeyOps + ?Sized>(&self, ops: &mut O, key: &Value) -> CallResult<Slot> {
        if let Some(fast) = FastKey::of(key) {
            return Ok(self.locate_fast(fast));
        }
        let hash = ops.hash_key(key)?;
        if let Some(indices) = self.buckets.get(&hash) {
            for &index in indices {
                if let Some(entry) = &self.entries[index] {
                    if ops.keys_eql(&entry.key, key)? {
                        return Ok(Slot::Slow {
                            hash,
                            index: Some(index),
                        });
                    }
                }
            }
        }
        Ok(Slot::Slow { hash, index: None })
    }

    /// Fast-path lookup; never calls out.
    pub fn locate_fast(&self, key: FastKey) -> Slot {
        let index = self.fast.get(&key).copied();
        Slot::Fast(key, index)
    }

    /// Keys sharing `hash`, with their entry indices.
    ///
    /// The keys are cloned so the caller can compare them after releasing any
    /// borrow on the table.
    pub fn candidates(&self, hash: i64) -> SmallVec<[(usize, Value); 2]> {
        let Some(indices) = self.buckets.get(&hash) else {
            return SmallVec::new();
        };
        indices
            .iter()
            .filter_map(|&index| {
                self.entries[index]
                    .as_ref()
                    .map(|entry| (index, entry.key.clone()))
            })
            .collect()
    }

    /// Value stored at an entry index returned by `locate`.
    pub fn value_at(&self, index: usize) -> Option<&V> {
        self.entries
            .get(index)
            .and_then(Option::as_ref)
            .map(|entry| &entry.value)
    }

    /// Write `value` at `slot`: replace in place when the key is present,
    /// append otherwise. Returns the replaced value.
    pub fn store(&mut self, slot: Slot, key: Value, value: V) -> Option<V> {
        match slot {
            Slot::Fast(fast, index) => {
                if let Some(entry) = index.and_then(|i| self.entries.get_mut(i)).and_then(Option::as_mut) {
                    return Some(std::mem::replace(&mut entry.value, value));
                }
                let index = self.push(key, value, None);
                self.fast.insert(fast, index);
                None
            }
            Slot::Slow { hash, index } => {
                if let Some(entry) = index
                    .and_then(|i| self.entries.get_mut(i))
                    .and_then(Option::as_mut)
                    .filter(|entry| entry.hash == Some(hash))
                {
                    return Some(std::mem::replace(&mut entry.value, value));
                }
                let index = self.push(key, value, Some(hash));
                self.buckets.entry(hash).or_default().push(index);
                None
            }
        }
    }

    /// Remove the entry at `slot`, returning its key and value.
    pub fn take(&mut self, slot: &Slot) -> Option<(Value, V)> {
        let index = slot.index()?;
        let entry = self.entries.get_mut(index)?.take()?;
        match slot {
            Slot::Fast(fast, _) => {
                self.fast.remove(fast);
            }
            Slot::Slow { hash, .. } => {
                if let Some(bucket) = self.buckets.get_mut(hash) {
                    bucket.retain(|i| *i != index);
                    if bucket.is_empty() {
                        self.buckets.remove(hash);
                    }
                }
            }
        }
        self.live -= 1;
        self.bump();
        self.maybe_compact();
        Some((entry.key, entry.value))
    }

    pub fn get<O: KeyOps + ?Sized>(&self, ops: &mut O, key: &Value) -> CallResult<Option<&V>> {
        let slot = self.locate(ops, key)?;
        Ok(slot.index().and_then(|index| self.value_at(index)))
    }

    pub fn put<O: KeyOps + ?Sized>(
        &mut self,
        ops: &mut O,
        key: Value,
        value: V,
    ) -> CallResult<Option<V>> {
        let slot = self.locate(ops, &key)?;
        Ok(self.store(slot, key, value))
    }

    pub fn delete<O: KeyOps + ?Sized>(&mut self, ops: &mut O, key: &Value) -> CallResult<Option<V>> {
        let slot = self.locate(ops, key)?;
        Ok(self.take(&slot).map(|(_, value)| value))
    }

    // Symbol-keyed access for method tables and constant scopes.

    pub fn get_name(&self, name: Name) -> Option<&V> {
        self.fast
            .get(&FastKey::Sym(name))
            .and_then(|&index| self.value_at(index))
    }

    pub fn contains_name(&self, name: Name) -> bool {
        self.fast.contains_key(&FastKey::Sym(name))
    }

    pub fn put_name(&mut self, name: Name, value: V) -> Option<V> {
        let slot = self.locate_fast(FastKey::Sym(name));
        self.store(slot, Value::Symbol(name), value)
    }

    pub fn remove_name(&mut self, name: Name) -> Option<V> {
        let slot = self.locate_fast(FastKey::Sym(name));
        self.take(&slot).map(|(_, value)| value)
    }

    /// Symbol keys in insertion order.
    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        self.keys().filter_map(|key| match key {
            Value::Symbol(name) => Some(*name),
            _ => None,
        })
    }

    /// Live keys with their entry indices, for building a [`RehashPlan`].
    pub fn live_keys(&self) -> Vec<(usize, Value)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|e| (index, e.key.clone())))
            .collect()
    }

    /// Recompute slow-key hashes and collapse keys that have become equal.
    pub fn rehash<O: KeyOps + ?Sized>(&mut self, ops: &mut O) -> CallResult<()> {
        let keys = self.live_keys();
        let plan = RehashPlan::build(ops, &keys)?;
        self.apply_rehash(&plan);
        Ok(())
    }

    /// Apply a plan built from [`HashTable::live_keys`].
    ///
    /// Entries the plan does not mention keep their old hash, so entries added
    /// after the snapshot survive.
    pub fn apply_rehash(&mut self, plan: &RehashPlan) {
        for &(index, hash) in &plan.rehashed {
            if let Some(entry) = self.entries.get_mut(index).and_then(Option::as_mut) {
                if entry.hash.is_some() {
                    entry.hash = Some(hash);
                }
            }
        }
        for &index in &plan.dropped {
            if let Some(slot) = self.entries.get_mut(index) {
                if slot.take().is_some() {
                    self.live -= 1;
                }
            }
        }
        self.compact();
    }

    fn push(&mut self, key: Value, value: V, hash: Option<i64>) -> usize {
        let index = self.entries.len();
        self.entries.push(Some(Entry { key, value, hash }));
        self.live += 1;
        self.bump();
        index
    }

    #[inline]
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn maybe_compact(&mut self) {
        if self.entries.len() >= COMPACT_MIN_SLOTS && self.live * 2 < self.entries.len() {
            self.compact();
        }
    }

    /// Drop tombstones and rebuild both indexes.
    fn compact(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        self.bump();
        self.fast.clear();
        self.buckets.clear();
        self.live = 0;
        for entry in entries.into_iter().flatten() {
            let index = self.entries.len();
            match (entry.hash, FastKey::of(&entry.key)) {
                (None, Some(fast)) => {
                    self.fast.insert(fast, index);
                }
                (Some(hash), _) => self.buckets.entry(hash).or_default().push(index),
                (None, None) => continue,
            }
            self.entries.push(Some(entry));
            self.live += 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.entries.len()
    }
}

impl<V: fmt::Debug> fmt::Debug for HashTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Outcome of recomputing slow-key hashes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RehashPlan {
    rehashed: Vec<(usize, i64)>,
    dropped: Vec<usize>,
}

impl RehashPlan {
    /// Hash every slow key in `keys` (insertion order) and mark later
    /// duplicates for removal, so the first of a set of equal keys wins.
    pub fn build<O: KeyOps + ?Sized>(ops: &mut O, keys: &[(usize, Value)]) -> CallResult<Self> {
        let mut plan = RehashPlan::default();
        let mut kept: FxHashMap<i64, SmallVec<[usize; 2]>> = FxHashMap::default();
        for (position, (index, key)) in keys.iter().enumerate() {
            if FastKey::of(key).is_some() {
                continue;
            }
            let hash = ops.hash_key(key)?;
            let group = kept.entry(hash).or_default();
            let mut duplicate = false;
            for &earlier in group.iter() {
                if ops.keys_eql(&keys[earlier].1, key)? {
                    duplicate = true;
                    break;
                }
            }
            if duplicate {
                plan.dropped.push(*index);
            } else {
                group.push(position);
                plan.rehashed.push((*index, hash));
            }
        }
        Ok(plan)
    }

    /// Entry indices removed as duplicates.
    pub fn dropped(&self) -> &[usize] {
        &self.dropped
    }
}
