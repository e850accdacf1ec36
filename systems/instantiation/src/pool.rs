//! Bounded per-prototype instance pool.

use std::collections::{BTreeMap, VecDeque};

use rollway_core::{InstanceId, PrototypeId};

/// Idle instances kept per prototype before releases start destroying.
pub const POOL_CAPACITY: usize = 20;

/// Fate of a released instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// Disabled and queued for reuse.
    Recycled,
    /// Destroyed, either because recycling is off or the queue was full.
    Destroyed,
    /// The instance was not live.
    Unknown,
}

/// Owner of every instance handed to the host.
///
/// With recycling on, [`Pool::acquire`] pops from a bounded per-prototype
/// queue before allocating and [`Pool::release`] pushes back into it. With
/// recycling off every acquire allocates and every release destroys. The
/// pool also tracks live instances so teardown can account for all of them.
#[derive(Debug)]
pub struct Pool {
    recycling_supported: bool,
    recycling: bool,
    capacity: usize,
    idle: BTreeMap<PrototypeId, VecDeque<InstanceId>>,
    live: BTreeMap<InstanceId, PrototypeId>,
    next_instance: u64,
    allocated: u64,
    destroyed: u64,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new(POOL_CAPACITY)
    }
}

impl Pool {
    /// Creates a pool that can recycle up to `capacity` idle instances per prototype.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            recycling_supported: true,
            recycling: false,
            capacity,
            idle: BTreeMap::new(),
            live: BTreeMap::new(),
            next_instance: 1,
            allocated: 0,
            destroyed: 0,
        }
    }

    /// Creates a pool that can only allocate and destroy.
    #[must_use]
    pub fn direct() -> Self {
        Self {
            recycling_supported: false,
            ..Self::new(0)
        }
    }

    /// Reports whether the pool can recycle at all.
    #[must_use]
    pub fn supports_recycling(&self) -> bool {
        self.recycling_supported
    }

    /// Reports whether recycling is currently active.
    #[must_use]
    pub fn is_recycling(&self) -> bool {
        self.recycling
    }

    /// Switches recycling on or off, returning the resulting state.
    ///
    /// Turning recycling off destroys every idle instance.
    pub fn set_recycling(&mut self, enabled: bool) -> bool {
        self.recycling = enabled && self.recycling_supported;
        if !self.recycling {
            let idle: usize = self.idle.values().map(VecDeque::len).sum();
            self.destroyed += idle as u64;
            self.idle.clear();
        }
        self.recycling
    }

    /// Hands out an instance of `prototype`.
    pub fn acquire(&mut self, prototype: PrototypeId) -> InstanceId {
        let recycled = if self.recycling {
            self.idle
                .get_mut(&prototype)
                .and_then(VecDeque::pop_front)
        } else {
            None
        };
        let instance = recycled.unwrap_or_else(|| self.allocate());
        let _ = self.live.insert(instance, prototype);
        instance
    }

    /// Returns an instance to the pool.
    pub fn release(&mut self, instance: InstanceId) -> Release {
        let Some(prototype) = self.live.remove(&instance) else {
            return Release::Unknown;
        };
        if self.recycling {
            let queue = self.idle.entry(prototype).or_default();
            if queue.len() < self.capacity {
                queue.push_back(instance);
                return Release::Recycled;
            }
        }
        self.destroyed += 1;
        Release::Destroyed
    }

    /// Releases every live instance, returning how many were live.
    pub fn release_all(&mut self) -> usize {
        let live: Vec<InstanceId> = self.live.keys().copied().collect();
        for instance in &live {
            let _ = self.release(*instance);
        }
        live.len()
    }

    /// Instances currently handed out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.live.len()
    }

    /// Idle instances queued for `prototype`.
    #[must_use]
    pub fn idle_count(&self, prototype: PrototypeId) -> usize {
        self.idle.get(&prototype).map_or(0, VecDeque::len)
    }

    /// Instances allocated over the pool's lifetime.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Instances destroyed over the pool's lifetime.
    #[must_use]
    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    fn allocate(&mut self) -> InstanceId {
        let instance = InstanceId::new(self.next_instance);
        self.next_instance += 1;
        self.allocated += 1;
        instance
    }
}

#[cfg(test)]
mod tests {
    use rollway_core::{InstanceId, PrototypeId};

    use super::{Pool, Release};

    #[test]
    fn recycling_reuses_released_instances() {
        let mut pool = Pool::new(2);
        assert!(pool.set_recycling(true));
        let wall = PrototypeId::new(2);

        let first = pool.acquire(wall);
        assert_eq!(pool.release(first), Release::Recycled);
        assert_eq!(pool.idle_count(wall), 1);
        assert_eq!(pool.acquire(wall), first);
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.in_use(), 1);
    }

    #[test]
    fn overflow_is_destroyed() {
        let mut pool = Pool::new(1);
        let _ = pool.set_recycling(true);
        let ground = PrototypeId::new(1);
        let first = pool.acquire(ground);
        let second = pool.acquire(ground);
        assert_eq!(pool.release(first), Release::Recycled);
        assert_eq!(pool.release(second), Release::Destroyed);
        assert_eq!(pool.destroyed(), 1);
        assert_eq!(pool.idle_count(ground), 1);
    }

    #[test]
    fn direct_pool_never_recycles() {
        let mut pool = Pool::direct();
        assert!(!pool.supports_recycling());
        assert!(!pool.set_recycling(true));
        let ground = PrototypeId::new(1);
        let instance = pool.acquire(ground);
        assert_eq!(pool.release(instance), Release::Destroyed);
        assert_ne!(pool.acquire(ground), instance);
    }

    #[test]
    fn release_all_empties_the_live_set() {
        let mut pool = Pool::default();
        let _ = pool.set_recycling(true);
        for id in 1..=5 {
            let _ = pool.acquire(PrototypeId::new(id));
        }
        assert_eq!(pool.release_all(), 5);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.release(InstanceId::new(1)), Release::Unknown);
    }

    #[test]
    fn disabling_recycling_drops_idle_instances() {
        let mut pool = Pool::default();
        let _ = pool.set_recycling(true);
        let ground = PrototypeId::new(1);
        let instance = pool.acquire(ground);
        let _ = pool.release(instance);
        assert!(!pool.set_recycling(false));
        assert_eq!(pool.idle_count(ground), 0);
        assert_eq!(pool.destroyed(), 1);
    }
}
