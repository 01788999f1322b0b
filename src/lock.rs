//! # Lock Manager (C4)
//!
//! Per-path multi-reader/single-writer admission ("turns"), plus a
//! process-wide exclusive drain used by `clear()`. Re-architected from the
//! source's single-threaded cooperative scheduler onto `std::sync`
//! primitives (spec §9): there is no async runtime anywhere in this crate,
//! mirroring the teacher's blocking I/O style, so ordinary `Mutex`/`Condvar`
//! turners are the idiomatic fit. A `Turn` is an RAII guard — it is always
//! ended on drop, so a panicking or early-returning caller can never leave
//! a turner stuck, without needing an explicit finally-block idiom.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

struct TurnerState {
    active_readers: usize,
    writer_active: bool,
    waiting_writers: usize,
    /// Set by a global drain in progress; blocks new turns on this path
    /// until the drain releases it.
    globally_locked: bool,
}

/// The per-path admission handle. Held in the [`LockManager`]'s turner map,
/// keyed by the path's string form; entries with no live `Turn` are pruned
/// opportunistically rather than relying on finalization timing (spec §9's
/// accepted equivalent to a weak-value map).
struct Turner {
    state: Mutex<TurnerState>,
    cond: Condvar,
}

impl Turner {
    fn new() -> Self {
        Self {
            state: Mutex::new(TurnerState {
                active_readers: 0,
                writer_active: false,
                waiting_writers: 0,
                globally_locked: false,
            }),
            cond: Condvar::new(),
        }
    }

    fn get_turn(self: &Arc<Self>, concurrency: bool) -> Turn {
        let mut state = self.state.lock().unwrap();
        if concurrency {
            state = self
                .cond
                .wait_while(state, |s| {
                    s.globally_locked || s.writer_active || s.waiting_writers > 0
                })
                .unwrap();
            state.active_readers += 1;
        } else {
            state.waiting_writers += 1;
            state = self
                .cond
                .wait_while(state, |s| {
                    s.globally_locked || s.writer_active || s.active_readers > 0
                })
                .unwrap();
            state.waiting_writers -= 1;
            state.writer_active = true;
        }
        drop(state);
        Turn {
            turner: Arc::clone(self),
            write: !concurrency,
            ended: false,
        }
    }

    fn end_turn(&self, write: bool) {
        let mut state = self.state.lock().unwrap();
        if write {
            state.writer_active = false;
        } else {
            state.active_readers -= 1;
        }
        drop(state);
        self.cond.notify_all();
    }

    fn is_idle(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.active_readers == 0 && !state.writer_active
    }

    fn set_globally_locked(&self, locked: bool) {
        let mut state = self.state.lock().unwrap();
        state.globally_locked = locked;
        drop(state);
        self.cond.notify_all();
    }

    fn wait_until_idle(&self) {
        let state = self.state.lock().unwrap();
        let _ = self
            .cond
            .wait_while(state, |s| s.active_readers > 0 || s.writer_active)
            .unwrap();
    }
}

/// A held admission on a path. Must be released by ending it; dropping it
/// (on any exit path, including panics) ends it automatically.
pub struct Turn {
    turner: Arc<Turner>,
    write: bool,
    ended: bool,
}

impl Turn {
    /// Explicit early release. Equivalent to dropping the `Turn`.
    pub fn end(mut self) {
        self.end_inner();
    }

    fn end_inner(&mut self) {
        if !self.ended {
            self.turner.end_turn(self.write);
            self.ended = true;
        }
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        self.end_inner();
    }
}

/// Coordinates many readers, one writer per path, and a global drain.
#[derive(Default)]
pub struct LockManager {
    turners: Mutex<HashMap<String, Arc<Turner>>>,
    global: Arc<GlobalLock>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            turners: Mutex::new(HashMap::new()),
            global: Arc::new(GlobalLock::new()),
        }
    }

    fn turner_for(&self, key: &str) -> Arc<Turner> {
        let mut turners = self.turners.lock().unwrap();
        turners.retain(|_, t| Arc::strong_count(t) > 1);
        turners
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Turner::new()))
            .clone()
    }

    /// Acquires a turn on `key` ("concurrency: true" for a reader, "false"
    /// for a writer). Blocks while a global drain is in progress.
    pub fn get_turn(&self, key: &str, concurrency: bool) -> Turn {
        self.global.wait_until_clear();
        let turner = self.turner_for(key);
        turner.get_turn(concurrency)
    }

    /// Acquires write turns on two paths in a fixed order (destination
    /// first, then source) so that two concurrent moves targeting the same
    /// destination cannot race past existence checks onto the same target.
    ///
    /// When `destination_key == source_key` (e.g. `copyFile("/a","/a")`, or
    /// a `renameFile` whose computed destination happens to equal its
    /// source) both keys resolve to the same turner; acquiring a second
    /// write turn on it would wait forever on the `writer_active` flag this
    /// same call just set. In that case only the one turn is acquired and
    /// `None` stands in for the second.
    pub fn get_turn_pair(&self, destination_key: &str, source_key: &str) -> (Turn, Option<Turn>) {
        self.global.wait_until_clear();
        let destination_turner = self.turner_for(destination_key);
        let destination_turn = destination_turner.get_turn(false);
        if destination_key == source_key {
            return (destination_turn, None);
        }
        let source_turner = self.turner_for(source_key);
        let source_turn = source_turner.get_turn(false);
        (destination_turn, Some(source_turn))
    }

    /// Acquires the process-wide exclusive drain: waits until no global
    /// lock is held, locks every existing turner (blocking new turns on any
    /// path), waits for all outstanding turns to end, then installs the
    /// barrier that blocks every other operation until release.
    pub fn acquire_global_lock(&self) -> GlobalGuard {
        self.global.acquire();
        let snapshot: Vec<Arc<Turner>> = {
            let turners = self.turners.lock().unwrap();
            turners.values().cloned().collect()
        };
        for turner in &snapshot {
            turner.set_globally_locked(true);
        }
        for turner in &snapshot {
            turner.wait_until_idle();
        }
        GlobalGuard {
            global: Arc::clone(&self.global),
            turners: snapshot,
        }
    }
}

struct GlobalLock {
    draining: Mutex<bool>,
    cond: Condvar,
}

impl GlobalLock {
    fn new() -> Self {
        Self {
            draining: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn wait_until_clear(&self) {
        let draining = self.draining.lock().unwrap();
        let _ = self.cond.wait_while(draining, |d| *d).unwrap();
    }

    fn acquire(&self) {
        let mut draining = self.draining.lock().unwrap();
        draining = self.cond.wait_while(draining, |d| *d).unwrap();
        *draining = true;
    }

    fn release(&self) {
        let mut draining = self.draining.lock().unwrap();
        *draining = false;
        drop(draining);
        self.cond.notify_all();
    }
}

/// Held while a global drain is in progress. Dropping it (including via an
/// early-returning or panicking caller) releases the drain.
pub struct GlobalGuard {
    global: Arc<GlobalLock>,
    turners: Vec<Arc<Turner>>,
}

impl Drop for GlobalGuard {
    fn drop(&mut self) {
        for turner in &self.turners {
            turner.set_globally_locked(false);
        }
        self.global.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn readers_do_not_block_each_other() {
        let manager = LockManager::new();
        let t1 = manager.get_turn("/p", true);
        let t2 = manager.get_turn("/p", true);
        drop(t1);
        drop(t2);
    }

    #[test]
    fn writer_excludes_other_writers() {
        let manager = Arc::new(LockManager::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            let counter = Arc::clone(&counter);
            let overlap = Arc::clone(&overlap);
            handles.push(thread::spawn(move || {
                let _turn = manager.get_turn("/shared", false);
                let before = counter.fetch_add(1, Ordering::SeqCst);
                if before != 0 {
                    overlap.fetch_add(1, Ordering::SeqCst);
                }
                thread::sleep(Duration::from_millis(2));
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn global_drain_waits_for_outstanding_turn() {
        let manager = Arc::new(LockManager::new());
        let reader_turn = manager.get_turn("/p", true);
        let released = Arc::new(AtomicUsize::new(0));

        let drain_manager = Arc::clone(&manager);
        let drain_released = Arc::clone(&released);
        let drainer = thread::spawn(move || {
            let _guard = drain_manager.acquire_global_lock();
            assert_eq!(drain_released.load(Ordering::SeqCst), 1);
        });

        thread::sleep(Duration::from_millis(20));
        released.store(1, Ordering::SeqCst);
        drop(reader_turn);
        drainer.join().unwrap();
    }
}
