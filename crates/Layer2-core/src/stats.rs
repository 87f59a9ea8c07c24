//! Pipeline statistics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PipelineStats {
    admitted: AtomicU64,
    dropped: AtomicU64,
    pruned: AtomicU64,
    obsoleted: AtomicU64,
    flood_discarded: AtomicU64,
    unrouted: AtomicU64,
    processed: AtomicU64,
    handler_failures: AtomicU64,
    input_processed: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub admitted: u64,
    pub dropped: u64,
    pub pruned: u64,
    pub obsoleted: u64,
    pub flood_discarded: u64,
    pub unrouted: u64,
    pub processed: u64,
    pub handler_failures: u64,
    pub input_processed: u64,
}

macro_rules! counters {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl PipelineStats {
            $(
                pub(crate) fn $name(&self, n: u64) {
                    self.$field.fetch_add(n, Ordering::Relaxed);
                }
            )*

            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)*
                }
            }

            pub fn reset(&self) {
                $(self.$field.store(0, Ordering::Relaxed);)*
            }
        }
    };
}

counters! {
    add_admitted => admitted,
    add_dropped => dropped,
    add_pruned => pruned,
    add_obsoleted => obsoleted,
    add_flood_discarded => flood_discarded,
    add_unrouted => unrouted,
    add_processed => processed,
    add_handler_failures => handler_failures,
    add_input_processed => input_processed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let stats = PipelineStats::default();
        stats.add_admitted(3);
        stats.add_pruned(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.admitted, 3);
        assert_eq!(snapshot.pruned, 2);
        assert_eq!(snapshot.processed, 0);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
