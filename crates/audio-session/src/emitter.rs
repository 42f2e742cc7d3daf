//! EventEmitter - pushes state machine events to the application.
//!
//! Events are advisory. If the outbound channel is full or gone, the event is
//! dropped and counted; the state machine is never blocked on a slow reader.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sessionproto::EventEnvelope;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Delivery counters, readable from any thread.
#[derive(Debug, Default)]
pub struct EmitterStats {
    pub emitted: AtomicU64,
    pub dropped: AtomicU64,
}

impl EmitterStats {
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Sending half of the event channel.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<EventEnvelope>,
    stats: Arc<EmitterStats>,
}

impl EventEmitter {
    /// Create an emitter and the receiver the application reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let emitter = Self {
            tx,
            stats: Arc::new(EmitterStats::default()),
        };
        (emitter, rx)
    }

    /// Hand one event to the channel without waiting.
    ///
    /// Returns whether the event was accepted.
    pub fn emit(&self, envelope: EventEnvelope) -> bool {
        let type_name = envelope.event.type_name();
        match self.tx.try_send(envelope) {
            Ok(()) => {
                self.stats.emitted.fetch_add(1, Ordering::Relaxed);
                debug!("emitted {} event", type_name);
                true
            }
            Err(mpsc::error::TrySendError::Full(envelope)) => {
                let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "event channel full, dropped {} (seq {}, {} dropped so far)",
                    type_name, envelope.sequence, dropped
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(envelope)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "no event listener, dropped {} (seq {})",
                    type_name, envelope.sequence
                );
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<EmitterStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessionproto::SessionEvent;

    fn hint(sequence: u64) -> EventEnvelope {
        EventEnvelope::new(sequence, SessionEvent::SilenceSecondaryAudioHint { begin: true })
    }

    #[test]
    fn delivers_in_order() {
        let (emitter, mut rx) = EventEmitter::channel(4);
        assert!(emitter.emit(hint(1)));
        assert!(emitter.emit(hint(2)));

        assert_eq!(rx.try_recv().unwrap().sequence, 1);
        assert_eq!(rx.try_recv().unwrap().sequence, 2);
        assert_eq!(emitter.stats().emitted(), 2);
    }

    #[test]
    fn full_channel_drops_and_counts() {
        let (emitter, mut rx) = EventEmitter::channel(1);
        assert!(emitter.emit(hint(1)));
        assert!(!emitter.emit(hint(2)));
        assert!(!emitter.emit(hint(3)));

        let stats = emitter.stats();
        assert_eq!(stats.emitted(), 1);
        assert_eq!(stats.dropped(), 2);

        // Room again after the reader catches up
        assert_eq!(rx.try_recv().unwrap().sequence, 1);
        assert!(emitter.emit(hint(4)));
        assert_eq!(rx.try_recv().unwrap().sequence, 4);
    }

    #[test]
    fn closed_channel_is_not_fatal() {
        let (emitter, rx) = EventEmitter::channel(4);
        drop(rx);
        assert!(!emitter.emit(hint(1)));
        assert_eq!(emitter.stats().dropped(), 1);
    }
}
