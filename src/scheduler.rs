//! Named, cancellable one-shot timers advanced by the frame tick.

use std::time::Duration;

#[derive(Debug, Clone)]
struct Pending<K> {
    kind: K,
    due: Duration,
    seq: u64,
}

/// Deferred tasks keyed by kind. Scheduling a kind that is already pending replaces it,
/// so a stale timer never fires after state has moved on.
#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    now: Duration,
    next_seq: u64,
    pending: Vec<Pending<K>>,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<K: PartialEq + Clone> Scheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `kind` after `delay`, cancelling any pending task of the same kind.
    pub fn schedule(&mut self, kind: K, delay: Duration) {
        self.cancel(&kind);
        self.pending.push(Pending {
            kind,
            due: self.now + delay,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    /// Returns true if something was cancelled.
    pub fn cancel(&mut self, kind: &K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.kind != *kind);
        self.pending.len() != before
    }

    pub fn is_pending(&self, kind: &K) -> bool {
        self.pending.iter().any(|p| p.kind == *kind)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Move time forward and return due tasks, earliest first (ties in scheduling order).
    pub fn advance(&mut self, dt: Duration) -> Vec<K> {
        self.now += dt;
        let now = self.now;
        let mut due: Vec<Pending<K>> = Vec::new();
        self.pending.retain(|p| {
            if p.due <= now {
                due.push(p.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|p| (p.due, p.seq));
        due.into_iter().map(|p| p.kind).collect()
    }
}
