//! Tokio scheduler - drain and recovery requests over an mpsc channel
//!
//! Drain requests are queued as ticks for the host loop. Recovery requests
//! sleep on the runtime first, so they only reach the loop once their delay
//! has elapsed.

use beacon_core::{DrainStatus, EventManager, Scheduler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Drain,
    Recovery,
}

pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Tick>,
    /// Recovery timers still sleeping
    pending_recoveries: Arc<AtomicUsize>,
}

impl TokioScheduler {
    pub fn new() -> (Self, TickLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending_recoveries = Arc::new(AtomicUsize::new(0));
        let scheduler = Self {
            tx,
            pending_recoveries: pending_recoveries.clone(),
        };
        let ticks = TickLoop {
            rx,
            pending_recoveries,
            recoveries_fired: 0,
        };
        (scheduler, ticks)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_drain(&self) {
        if self.tx.send(Tick::Drain).is_err() {
            warn!("Drain request dropped: tick loop is gone");
        }
    }

    fn schedule_recovery(&self, delay: Duration) {
        let tx = self.tx.clone();
        let pending = self.pending_recoveries.clone();
        pending.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(Tick::Recovery).is_err() {
                debug!("Recovery tick dropped: tick loop is gone");
            }
            pending.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

/// Receiving end, owned by the host loop
pub struct TickLoop {
    rx: mpsc::UnboundedReceiver<Tick>,
    pending_recoveries: Arc<AtomicUsize>,
    recoveries_fired: usize,
}

impl TickLoop {
    /// Serve every tick already queued. Returns the number of drain steps run.
    pub fn run_ready(&mut self, manager: &EventManager) -> usize {
        let mut steps = 0;
        while let Ok(tick) = self.rx.try_recv() {
            steps += self.serve(tick, manager);
        }
        steps
    }

    /// Serve ticks until no drain is queued and no recovery timer is
    /// sleeping. Returns the number of drain steps run.
    pub async fn run_until_settled(&mut self, manager: &EventManager) -> usize {
        let mut steps = self.run_ready(manager);
        while self.pending_recoveries.load(Ordering::SeqCst) > 0 {
            let Some(tick) = self.rx.recv().await else {
                break;
            };
            steps += self.serve(tick, manager);
            steps += self.run_ready(manager);
        }
        steps
    }

    pub fn recoveries_fired(&self) -> usize {
        self.recoveries_fired
    }

    fn serve(&mut self, tick: Tick, manager: &EventManager) -> usize {
        match tick {
            Tick::Drain => {
                let mut steps = 1;
                while manager.drain_step() == DrainStatus::Rearm {
                    steps += 1;
                }
                steps
            }
            Tick::Recovery => {
                self.recoveries_fired += 1;
                manager.on_no_focus();
                0
            }
        }
    }
}
