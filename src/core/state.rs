//! Process-wide plugin state shared between the host callbacks.
//!
//! The `write` and `notification` callbacks may fire from other threads while
//! a poll is reading the counters, so everything in here is atomic. The state
//! lives as long as the process; nothing resets it between polls.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Whether the one-off "plugin started" notification has gone out yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupNotice {
    NotYetSent,
    Sent,
}

impl StartupNotice {
    const fn as_u8(self) -> u8 {
        match self {
            StartupNotice::NotYetSent => 0,
            StartupNotice::Sent => 1,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => StartupNotice::NotYetSent,
            _ => StartupNotice::Sent,
        }
    }
}

/// Cumulative counters and the startup-notice state machine.
#[derive(Debug)]
pub struct PluginState {
    datapoints: AtomicU64,
    notifications: AtomicU64,
    startup: AtomicU8,
}

impl PluginState {
    pub fn new() -> Self {
        Self {
            datapoints: AtomicU64::new(0),
            notifications: AtomicU64::new(0),
            startup: AtomicU8::new(StartupNotice::NotYetSent.as_u8()),
        }
    }

    /// Adds the number of values carried by one write event.
    pub fn record_datapoints(&self, count: u64) {
        self.datapoints.fetch_add(count, Ordering::Relaxed);
    }

    /// Counts one notification event.
    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn datapoints(&self) -> u64 {
        self.datapoints.load(Ordering::Relaxed)
    }

    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    pub fn startup_notice(&self) -> StartupNotice {
        StartupNotice::from_u8(self.startup.load(Ordering::Acquire))
    }

    /// Moves `NotYetSent -> Sent`. Returns `true` for exactly one caller over
    /// the lifetime of the state; that caller is the one that sends.
    pub fn claim_startup_notice(&self) -> bool {
        self.startup
            .compare_exchange(
                StartupNotice::NotYetSent.as_u8(),
                StartupNotice::Sent.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for PluginState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let state = PluginState::new();
        assert_eq!(state.datapoints(), 0);
        assert_eq!(state.notifications(), 0);
        assert_eq!(state.startup_notice(), StartupNotice::NotYetSent);
    }

    #[test]
    fn datapoints_accumulate_value_counts() {
        let state = PluginState::new();
        for len in [1u64, 3, 2] {
            state.record_datapoints(len);
        }
        assert_eq!(state.datapoints(), 6);
        assert_eq!(state.notifications(), 0);
    }

    #[test]
    fn startup_notice_is_claimed_once() {
        let state = PluginState::new();
        assert!(state.claim_startup_notice());
        assert!(!state.claim_startup_notice());
        assert_eq!(state.startup_notice(), StartupNotice::Sent);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let state = Arc::new(PluginState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || {
                    let mut claimed = 0;
                    for _ in 0..1000 {
                        state.record_datapoints(2);
                        state.record_notification();
                        if state.claim_startup_notice() {
                            claimed += 1;
                        }
                    }
                    claimed
                })
            })
            .collect();

        let claims: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(claims, 1);
        assert_eq!(state.datapoints(), 16_000);
        assert_eq!(state.notifications(), 8_000);
    }
}
