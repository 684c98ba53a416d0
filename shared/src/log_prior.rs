//! Broadcast of committed write-ahead log records to registered sinks.
//!
//! The log subsystem hands each committed unit of log records to a
//! [`LogRecordSource`], which invokes every registered [`LogRecordSink`] once
//! per unit, in generation order. Calls into sinks are serialized: a sink is
//! never entered by two threads at once, and a record broadcast on one thread
//! is fully delivered before the next one starts.

use std::{
    cell::Cell,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use log::debug;

/// Receives committed log records, one opaque payload per call.
pub trait LogRecordSink: Send + Sync {
    fn receive_log_records(&self, payload: Vec<u8>);
}

/// Handle returned by [`LogRecordSource::add_sink`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkKey(u64);

/// Source of committed log records.
///
/// Sinks are held weakly: once the last strong reference to a sink is gone it
/// is skipped, and pruned on the next broadcast.
pub trait LogRecordSource: Send + Sync {
    fn add_sink(&self, sink: Weak<dyn LogRecordSink>) -> SinkKey;

    /// Unregisters a sink. Returns `false` if the key was unknown.
    ///
    /// When this returns, no broadcast is executing the removed sink and none
    /// will start.
    fn remove_sink(&self, key: SinkKey) -> bool;
}

thread_local! {
    static IN_DELIVERY: Cell<bool> = const { Cell::new(false) };
}

fn in_delivery() -> bool {
    IN_DELIVERY.with(Cell::get)
}

// Marks the current thread as running sinks until dropped, unwinding included.
struct DeliveryScope;

impl DeliveryScope {
    fn enter() -> Self {
        IN_DELIVERY.with(|flag| flag.set(true));
        DeliveryScope
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        IN_DELIVERY.with(|flag| flag.set(false));
    }
}

struct SinkRegistry {
    next_key: u64,
    sinks: Vec<(SinkKey, Weak<dyn LogRecordSink>)>,
}

/// In-process [`LogRecordSource`].
///
/// Must not be re-entered from inside a sink: `send_list` and `remove_sink`
/// called from a sink callback would deadlock, and panic in debug builds.
pub struct LogPriorSender {
    registry: Mutex<SinkRegistry>,
    delivery: Mutex<()>,
}

impl LogPriorSender {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(SinkRegistry {
                next_key: 0,
                sinks: Vec::new(),
            }),
            delivery: Mutex::new(()),
        }
    }

    /// Delivers `payload` to every live sink, in registration order.
    ///
    /// The delivery lock is held for the whole broadcast, which serializes
    /// sink invocations across committing threads.
    pub fn send_list(&self, payload: Vec<u8>) {
        debug_assert!(
            !in_delivery(),
            "send_list called from inside a log record sink"
        );
        let delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let live = self.live_sinks();

        let scope = DeliveryScope::enter();
        if let Some((last, rest)) = live.split_last() {
            for sink in rest {
                sink.receive_log_records(payload.clone());
            }
            last.receive_log_records(payload);
        }
        drop(scope);

        // a sink whose last owner went away mid-broadcast is dropped here,
        // outside the delivery lock, so its teardown may unregister itself
        drop(delivery);
        drop(live);
    }

    pub fn sink_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sinks
            .len()
    }

    fn live_sinks(&self) -> Vec<Arc<dyn LogRecordSink>> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);

        let before = registry.sinks.len();
        registry.sinks.retain(|(_, sink)| sink.strong_count() > 0);
        if registry.sinks.len() != before {
            debug!("Pruned {} dropped log record sinks", before - registry.sinks.len());
        }

        registry
            .sinks
            .iter()
            .filter_map(|(_, sink)| sink.upgrade())
            .collect()
    }
}

impl Default for LogPriorSender {
    fn default() -> Self {
        Self::new()
    }
}

impl LogRecordSource for LogPriorSender {
    fn add_sink(&self, sink: Weak<dyn LogRecordSink>) -> SinkKey {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let key = SinkKey(registry.next_key);
        registry.next_key += 1;
        registry.sinks.push((key, sink));
        key
    }

    fn remove_sink(&self, key: SinkKey) -> bool {
        debug_assert!(
            !in_delivery(),
            "remove_sink called from inside a log record sink"
        );
        let removed = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            let before = registry.sinks.len();
            registry.sinks.retain(|(k, _)| *k != key);
            registry.sinks.len() != before
        };
        // wait out a broadcast that may still be running the removed sink
        drop(self.delivery.lock().unwrap_or_else(PoisonError::into_inner));
        removed
    }
}
