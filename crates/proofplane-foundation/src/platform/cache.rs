use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use proofplane_kernel::error::{ProofError, ProofResult};
use rand::RngCore;
use rand::rngs::OsRng;

/// Entries kept when nobody has set a capacity.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// In-process key/value cache handed out as the `"cache"` capability.
///
/// Bounded: once full, the oldest entry is evicted first.
#[derive(Debug)]
pub struct LocalCache {
    entries: DashMap<String, serde_json::Value>,
    order: Mutex<VecDeque<String>>,
    capacity: AtomicUsize,
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: AtomicUsize::new(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    /// Change the bound, evicting the oldest entries if it shrank.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity.max(1), Ordering::SeqCst);
        self.evict_overflow(&mut self.order.lock());
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        let mut order = self.order.lock();
        if self.entries.insert(key.clone(), value).is_none() {
            order.push_back(key);
        }
        self.evict_overflow(&mut order);
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        let mut order = self.order.lock();
        let removed = self.entries.remove(key).map(|(_, value)| value);
        if removed.is_some() {
            order.retain(|k| k != key);
        }
        removed
    }

    pub fn clear(&self) {
        let mut order = self.order.lock();
        order.clear();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_overflow(&self, order: &mut VecDeque<String>) {
        let capacity = self.capacity();
        while order.len() > capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

/// OS-backed random source handed out as the `"rng"` capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureRng;

impl SecureRng {
    pub fn fill(&self, buf: &mut [u8]) -> ProofResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| ProofError::Configuration(format!("secure random source unavailable: {e}")))
    }

    pub fn next_u64(&self) -> ProofResult<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}
