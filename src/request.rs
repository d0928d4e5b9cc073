use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Ticket for one in-flight computation. Newer tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Keeps only the result of the most recently started request. A slow,
/// superseded computation can finish but can no longer overwrite what a newer
/// one published.
#[derive(Debug)]
pub struct RequestGate<T> {
    issued: AtomicU64,
    latest: Mutex<Option<(Generation, T)>>,
}

impl<T> Default for RequestGate<T> {
    fn default() -> Self {
        Self { issued: AtomicU64::new(0), latest: Mutex::new(None) }
    }
}

impl<T> RequestGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request. Every earlier generation becomes stale.
    pub fn begin(&self) -> Generation {
        Generation(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.issued.load(Ordering::SeqCst) == generation.0
    }

    /// Store `value` if `generation` is still the newest request. Returns
    /// whether it was stored; a `false` means the caller's work is stale.
    pub fn publish(&self, generation: Generation, value: T) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_current(generation) {
            debug!(generation = generation.0, "dropping superseded result");
            return false;
        }
        *latest = Some((generation, value));
        true
    }

    /// Generation of the stored result, if any.
    pub fn published_generation(&self) -> Option<Generation> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).as_ref().map(|(g, _)| *g)
    }
}

impl<T: Clone> RequestGate<T> {
    pub fn latest(&self) -> Option<T> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn newest_request_wins_even_if_it_finishes_first() {
        let gate = RequestGate::new();
        let slow = gate.begin();
        let fast = gate.begin();
        assert!(gate.publish(fast, "fast"));
        assert!(!gate.publish(slow, "slow"), "stale result must be rejected");
        assert_eq!(gate.latest(), Some("fast"));
        assert_eq!(gate.published_generation(), Some(fast));
    }

    #[test]
    fn starting_a_request_makes_older_ones_stale() {
        let gate: RequestGate<u32> = RequestGate::new();
        let first = gate.begin();
        assert!(gate.is_current(first));
        let second = gate.begin();
        assert!(!gate.is_current(first));
        assert!(second > first);
        assert_eq!(gate.latest(), None);
    }

    #[test]
    fn concurrent_publishers_leave_only_the_newest() {
        let gate = Arc::new(RequestGate::new());
        let tickets: Vec<_> = (0..8).map(|_| gate.begin()).collect();
        let newest = *tickets.last().unwrap();
        let handles: Vec<_> = tickets
            .into_iter()
            .map(|g| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.publish(g, g.value()))
            })
            .collect();
        let stored: usize = handles.into_iter().map(|h| h.join().unwrap() as usize).sum();
        assert_eq!(stored, 1);
        assert_eq!(gate.latest(), Some(newest.value()));
    }
}
