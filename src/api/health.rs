//! Shared health state for the /health endpoint.
//! Updated by the Discord handler and the giveaway controller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

/// Shared health counters. Updated by bot components, read by API.
#[derive(Default)]
pub struct HealthState {
    /// True while the gateway session is up.
    pub gateway_connected: AtomicBool,
    /// Snapshot writes that failed since process start.
    pub persist_failures: AtomicU64,
    /// Announcement posts/edits that failed since process start.
    pub announce_failures: AtomicU64,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub gateway_connected: bool,
    pub persist_failures: u64,
    pub announce_failures: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_gateway_connected(&self, v: bool) {
        self.gateway_connected.store(v, Ordering::Relaxed);
    }

    pub fn inc_persist_failures(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_announce_failures(&self) {
        self.announce_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn gateway_connected(&self) -> bool {
        self.gateway_connected.load(Ordering::Relaxed)
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }

    pub fn announce_failures(&self) -> u64 {
        self.announce_failures.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> HealthReport {
        HealthReport {
            gateway_connected: self.gateway_connected(),
            persist_failures: self.persist_failures(),
            announce_failures: self.announce_failures(),
        }
    }
}
