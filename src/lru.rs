//! Weighted LRU bookkeeping with eviction hooks.
//!
//! The cache only tracks keys and weights; whoever owns the actual values
//! releases them when a key is evicted, either through a registered hook or
//! from the list of keys returned by [`EvictionCache::hit`].

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{AddAssign, SubAssign};

pub type EvictionHook<K> = Box<dyn FnMut(&K) + Send>;

struct Slot<K, W> {
    key: K,
    weight: W,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct EvictionCache<K, W> {
    slots: Vec<Slot<K, W>>,
    free: Vec<usize>,
    positions: HashMap<K, usize>,
    /// Least recently used end.
    head: Option<usize>,
    /// Most recently used end.
    tail: Option<usize>,
    current_weight: W,
    max_weight: W,
    min_count: usize,
    hooks: Vec<EvictionHook<K>>,
}

impl<K, W> EvictionCache<K, W>
where
    K: Eq + Hash + Clone,
    W: Copy + Default + PartialOrd + AddAssign + SubAssign,
{
    /// `min_count` entries always survive, even when they alone exceed
    /// `max_weight`.
    pub fn new(max_weight: W, min_count: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            positions: HashMap::new(),
            head: None,
            tail: None,
            current_weight: W::default(),
            max_weight,
            min_count,
            hooks: Vec::new(),
        }
    }

    /// Hooks run in registration order for every evicted key.
    pub fn add_eviction_hook(&mut self, hook: impl FnMut(&K) + Send + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Mark `key` as most recently used with the given weight and trim.
    ///
    /// Returns the evicted keys, least recently used first.
    pub fn hit(&mut self, key: K, weight: W) -> Vec<K> {
        if let Some(&slot) = self.positions.get(&key) {
            self.current_weight -= self.slots[slot].weight;
            self.unlink(slot);
            self.slots[slot].weight = weight;
            self.push_back(slot);
        } else {
            let slot = self.allocate(key.clone(), weight);
            self.push_back(slot);
            self.positions.insert(key, slot);
        }
        self.current_weight += weight;
        self.trim()
    }

    /// `hit` with unit weight.
    pub fn touch(&mut self, key: K) -> Vec<K>
    where
        W: From<u8>,
    {
        self.hit(key, W::from(1))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    pub fn total_weight(&self) -> W {
        self.current_weight
    }

    pub fn max_weight(&self) -> W {
        self.max_weight
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    /// Resident keys, least recently used first.
    pub fn keys_by_recency(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            keys.push(self.slots[slot].key.clone());
            cursor = self.slots[slot].next;
        }
        keys
    }

    fn trim(&mut self) -> Vec<K> {
        let mut evicted = Vec::new();
        while self.positions.len() > self.min_count && self.current_weight > self.max_weight {
            let Some(slot) = self.head else { break };
            self.unlink(slot);
            self.free.push(slot);
            let key = self.slots[slot].key.clone();
            self.positions.remove(&key);
            for hook in self.hooks.iter_mut() {
                hook(&key);
            }
            self.current_weight -= self.slots[slot].weight;
            evicted.push(key);
        }
        evicted
    }

    fn allocate(&mut self, key: K, weight: W) -> usize {
        let slot = Slot { key, weight, prev: None, next: None };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[slot].prev = None;
        self.slots[slot].next = None;
    }

    fn push_back(&mut self, slot: usize) {
        self.slots[slot].prev = self.tail;
        self.slots[slot].next = None;
        match self.tail {
            Some(t) => self.slots[t].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}
