//! Per-key write locks.

use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Upper bound on the stripe count exponent.
const MAX_STRIPES_POWER: u32 = 20;

/// Serializes writers per namespaced key.
///
/// Keys hash onto a fixed array of mutexes. Two keys that share a stripe
/// serialize against each other too; a key never maps to two stripes, so
/// writers to the same key are always exclusive. Readers never lock: they
/// rely on store snapshots instead.
pub struct LockManager {
    stripes: Box<[Mutex<()>]>,
    mask: u64,
}

/// Exclusive access to one key, released on drop.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl LockManager {
    /// Creates a lock manager with `2^power` stripes.
    ///
    /// `power` is clamped to 20.
    pub fn new(power: u32) -> Self {
        let count = 1usize << power.min(MAX_STRIPES_POWER);
        let stripes = (0..count).map(|_| Mutex::new(())).collect();
        Self {
            stripes,
            mask: count as u64 - 1,
        }
    }

    /// Returns the number of stripes.
    pub fn stripes(&self) -> usize {
        self.stripes.len()
    }

    /// Returns the stripe index `key` maps to.
    pub fn stripe_of(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() & self.mask) as usize
    }

    /// Blocks until `key` is exclusively held by the caller.
    pub fn lock(&self, key: &[u8]) -> LockGuard<'_> {
        LockGuard {
            _guard: self.stripes[self.stripe_of(key)].lock(),
        }
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("stripes", &self.stripes.len())
            .finish()
    }
}
