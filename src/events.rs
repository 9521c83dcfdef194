//! Observer registration with disposable subscription handles.
//!
//! Components that publish change notifications (sensor hub, link manager)
//! hand out crossbeam receivers. Dropping a receiver is the unsubscribe:
//! the corresponding sender fails on the next publish and is pruned.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::Mutex;

/// A set of subscribers to a cloneable event stream.
pub struct Observers<T> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> Observers<T> {
    /// Create an empty observer set.
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber. Dropping the returned receiver
    /// unsubscribes it.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        self.senders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    /// Publish a value to all live subscribers, pruning dead ones.
    pub fn emit(&self, value: T) {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders.retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Number of live subscribers (as of the last publish).
    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<T: Clone> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_emitted_values() {
        let observers: Observers<u32> = Observers::new();
        let rx1 = observers.subscribe();
        let rx2 = observers.subscribe();

        observers.emit(7);

        assert_eq!(rx1.try_recv().unwrap(), 7);
        assert_eq!(rx2.try_recv().unwrap(), 7);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let observers: Observers<u32> = Observers::new();
        let rx1 = observers.subscribe();
        let rx2 = observers.subscribe();
        assert_eq!(observers.subscriber_count(), 2);

        drop(rx2);
        observers.emit(1);

        assert_eq!(observers.subscriber_count(), 1);
        assert_eq!(rx1.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_emit_with_no_subscribers_is_noop() {
        let observers: Observers<u32> = Observers::new();
        observers.emit(42);
        assert_eq!(observers.subscriber_count(), 0);
    }
}
