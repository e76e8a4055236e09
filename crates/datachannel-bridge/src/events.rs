//! Channel events and the cross-thread event queue
//!
//! The [`EventQueue`] is the only shared mutable structure crossing the
//! producer/consumer thread boundary. It is unbounded by design: losing an
//! event for capacity reasons would desynchronize the consumer-visible
//! state from the true channel state.

use crate::provider::ReadyState;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;
use tracing::trace;

/// A channel event crossing the thread boundary.
///
/// Constructed by the producer-side sink, moved into the queue, and moved
/// out exactly once by the consumer-side dispatch path.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The channel moved to a new state
    StateChange(ReadyState),
    /// A message arrived from the remote peer
    Message {
        /// Raw frame payload
        data: Bytes,
        /// Whether the frame carries binary data rather than UTF-8 text
        is_binary: bool,
    },
}

impl ChannelEvent {
    /// Get the event name for logging/debugging
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::StateChange(_) => "state_change",
            ChannelEvent::Message { .. } => "message",
        }
    }
}

/// Unbounded FIFO of pending channel events.
///
/// Multiple producers may push from any thread; a single consumer drains.
/// Push order equals pop order, and a push racing a drain is either
/// included in that drain or left for the next one, never reordered
/// relative to other pushes.
pub struct EventQueue {
    events: Mutex<VecDeque<ChannelEvent>>,
    notify: Notify,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Append an event. Always succeeds; wakes the consumer if it is
    /// waiting.
    pub fn push(&self, event: ChannelEvent) {
        let depth = {
            let mut events = self.events.lock();
            events.push_back(event);
            events.len()
        };
        trace!(depth, "queued channel event");
        self.notify.notify_one();
    }

    /// Remove and return the oldest event, if any
    pub fn pop(&self) -> Option<ChannelEvent> {
        self.events.lock().pop_front()
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Wait until a push has happened since the last drain.
    ///
    /// A push that raced ahead of this call is not missed: the wakeup
    /// permit is stored and the call returns immediately.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    /// Wake a waiting consumer without pushing an event
    pub(crate) fn wake(&self) {
        self.notify.notify_one();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(
            ChannelEvent::StateChange(ReadyState::Open).name(),
            "state_change"
        );
        let msg = ChannelEvent::Message {
            data: Bytes::from_static(b"hi"),
            is_binary: false,
        };
        assert_eq!(msg.name(), "message");
    }

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new();
        for i in 0..5u8 {
            queue.push(ChannelEvent::Message {
                data: Bytes::copy_from_slice(&[i]),
                is_binary: true,
            });
        }
        assert_eq!(queue.len(), 5);

        for i in 0..5u8 {
            match queue.pop() {
                Some(ChannelEvent::Message { data, .. }) => assert_eq!(data[0], i),
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_while_drain() {
        use std::sync::Arc;

        let queue = Arc::new(EventQueue::new());
        let producer_queue = Arc::clone(&queue);

        const COUNT: u16 = 1000;
        let producer = std::thread::spawn(move || {
            for i in 0..COUNT {
                producer_queue.push(ChannelEvent::Message {
                    data: Bytes::copy_from_slice(&i.to_be_bytes()),
                    is_binary: true,
                });
            }
        });

        let mut seen = Vec::with_capacity(COUNT as usize);
        while seen.len() < COUNT as usize {
            match queue.pop() {
                Some(ChannelEvent::Message { data, .. }) => {
                    seen.push(u16::from_be_bytes([data[0], data[1]]));
                }
                Some(other) => panic!("unexpected event: {:?}", other),
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();

        // No loss, no duplication, no reordering.
        let expected: Vec<u16> = (0..COUNT).collect();
        assert_eq!(seen, expected);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_wakeup_not_missed() {
        let queue = EventQueue::new();
        // Push before anyone waits; the permit must be stored.
        queue.push(ChannelEvent::StateChange(ReadyState::Open));
        tokio::time::timeout(std::time::Duration::from_secs(1), queue.wait())
            .await
            .expect("wakeup permit was lost");
    }
}
