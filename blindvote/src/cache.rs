use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A per-key, populate-once cache.
///
/// Concurrent lookups for the same key share one slot: the first caller runs
/// the initializer while later callers for that key wait on the slot and reuse
/// its result. The map lock is only held to find or create the slot, never
/// while an initializer runs. A failed initialization leaves the slot empty so
/// the next caller tries again.
pub struct SingleFlight<V> {
    slots: Mutex<HashMap<String, Arc<OnceCell<Arc<V>>>>>,
}

impl<V> SingleFlight<V> {
    pub fn new() -> Self {
        SingleFlight {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `init` to produce it.
    pub fn get_or_try_init<F, E>(&self, key: &str, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        slot.get_or_try_init(|| init().map(Arc::new)).map(Arc::clone)
    }

    /// The cached value for `key`, if one has been populated
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let slots = self.slots.lock();
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Forget the cached value for `key`
    pub fn invalidate(&self, key: &str) {
        self.slots.lock().remove(key);
    }
}

impl<V> Default for SingleFlight<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn populates_once() {
        let cache: SingleFlight<u32> = SingleFlight::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_init::<_, ()>("a", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("a").as_deref(), Some(&7));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: SingleFlight<u32> = SingleFlight::new();
        assert_eq!(cache.get_or_try_init("a", || Err("down")), Err("down"));
        assert!(cache.get("a").is_none());
        assert_eq!(*cache.get_or_try_init::<_, ()>("a", || Ok(1)).unwrap(), 1);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let cache: SingleFlight<u32> = SingleFlight::new();
        cache.get_or_try_init::<_, ()>("a", || Ok(1)).unwrap();
        cache.invalidate("a");
        assert_eq!(*cache.get_or_try_init::<_, ()>("a", || Ok(2)).unwrap(), 2);
    }

    #[test]
    fn concurrent_first_access_runs_one_initializer() {
        let cache: Arc<SingleFlight<u32>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_try_init::<_, ()>("shared", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(42)
                        })
                        .map(|v| *v)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_keys_are_not_blocked() {
        let cache: Arc<SingleFlight<u32>> = Arc::new(SingleFlight::new());
        let started = Arc::new(Barrier::new(2));

        let slow = {
            let cache = cache.clone();
            let started = started.clone();
            thread::spawn(move || {
                cache
                    .get_or_try_init::<_, ()>("slow", || {
                        started.wait();
                        thread::sleep(Duration::from_millis(200));
                        Ok(1)
                    })
                    .map(|v| *v)
            })
        };

        started.wait();
        // "slow" is still initializing; a different key must not wait for it
        let begin = std::time::Instant::now();
        assert_eq!(*cache.get_or_try_init::<_, ()>("fast", || Ok(2)).unwrap(), 2);
        assert!(begin.elapsed() < Duration::from_millis(150));

        assert_eq!(slow.join().unwrap(), Ok(1));
    }
}
