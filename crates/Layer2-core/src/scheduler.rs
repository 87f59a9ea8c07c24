//! Manual scheduler - records requests instead of running a loop
//!
//! Used by tests and by hosts that poll the pipeline themselves.

use crate::manager::{DrainStatus, EventManager};
use crate::traits::Scheduler;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ManualScheduler {
    drain_requests: AtomicUsize,
    recovery_requests: Mutex<Vec<Duration>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain requests since the last call
    pub fn take_drain_requests(&self) -> usize {
        self.drain_requests.swap(0, Ordering::SeqCst)
    }

    pub fn pending_drains(&self) -> usize {
        self.drain_requests.load(Ordering::SeqCst)
    }

    /// Recovery delays requested since the last call
    pub fn take_recovery_requests(&self) -> Vec<Duration> {
        std::mem::take(&mut *self.recovery_requests.lock())
    }

    /// Serve every pending drain request; returns the number of steps run
    pub fn run_pending(&self, manager: &EventManager) -> usize {
        let mut steps = 0;
        while self.take_drain_requests() > 0 {
            loop {
                steps += 1;
                if manager.drain_step() == DrainStatus::Idle {
                    break;
                }
            }
        }
        steps
    }

    /// Fire every pending recovery check immediately
    pub fn fire_recoveries(&self, manager: &EventManager) -> usize {
        let fired = self.take_recovery_requests().len();
        for _ in 0..fired {
            manager.on_no_focus();
        }
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_drain(&self) {
        self.drain_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn schedule_recovery(&self, delay: Duration) {
        self.recovery_requests.lock().push(delay);
    }
}
