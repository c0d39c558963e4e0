//! Target Lock
//!
//! Shared sniff-target state between the control loop, operator
//! commands and auto-triage windows. Two guards with distinct roles:
//! an ops mutex serializing every set/clear (a triage window holds it
//! for its whole duration, so concurrent `sniff` requests block until
//! the window ends), and an inner lock around the target itself so the
//! control loop can keep reading it once per tick while a window is
//! held.

use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::address::HidAddress;

#[derive(Debug, Default)]
pub struct TargetLock {
    ops: Mutex<()>,
    target: RwLock<Option<HidAddress>>,
}

impl TargetLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock onto an address. Blocks while a triage window is open.
    pub fn set(&self, address: HidAddress) {
        let _ops = self.ops.lock();
        *self.target.write() = Some(address);
    }

    /// Drop any lock. Blocks while a triage window is open.
    pub fn clear(&self) {
        let _ops = self.ops.lock();
        *self.target.write() = None;
    }

    /// Current target, if any. Never blocks on an open triage window.
    pub fn current(&self) -> Option<HidAddress> {
        self.target.read().clone()
    }

    pub fn is_locked(&self) -> bool {
        self.target.read().is_some()
    }

    /// Auto-triage: hold the ops guard for the whole window so no other
    /// set/clear can race it, keep the target visible to the loop for
    /// `period`, then restore discovery.
    pub fn triage_window(&self, address: HidAddress, period: Duration) {
        let _ops = self.ops.lock();
        *self.target.write() = Some(address.clone());
        debug!("triage window open for {} ({:?})", address, period);

        std::thread::sleep(period);

        *self.target.write() = None;
        debug!("triage window closed for {}, restoring recon mode", address);
    }
}
