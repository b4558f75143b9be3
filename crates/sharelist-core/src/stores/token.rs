//! Staleness tokens and busy flags for optimistic mutations.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Monotonic counter marking the most recent local mutation.
///
/// A mutation takes a token when it applies its optimistic change; when its
/// remote write fails it may only roll back if that token is still the latest.
#[derive(Debug, Default)]
pub struct OperationTokens {
    latest: AtomicU64,
}

impl OperationTokens {
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Record a new mutation and return its token
    pub fn next_token(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_latest(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }
}

/// Single-slot flag: a second acquire while held is refused, not queued.
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Take the flag, or `None` when another operation holds it
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears its [`BusyFlag`] when dropped
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_newest_token_is_latest() {
        let tokens = OperationTokens::new();
        let first = tokens.next_token();
        assert!(tokens.is_latest(first));

        let second = tokens.next_token();
        assert!(second > first);
        assert!(!tokens.is_latest(first));
        assert!(tokens.is_latest(second));
    }

    #[test]
    fn busy_flag_refuses_second_holder_until_released() {
        let flag = BusyFlag::new();
        let guard = flag.try_acquire().expect("flag should be free");
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }
}
