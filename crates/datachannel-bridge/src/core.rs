//! Shared channel core
//!
//! [`ChannelCore`] is the state shared between the producer-side sinks
//! (the pre-adoption observer, then the proxy's sink) and the
//! consumer-side proxy: the handle slot, the attribute snapshot, and the
//! event queue. Adoption hands the whole core from the observer to the
//! proxy, so no event can slip between the two owners.

use crate::events::{ChannelEvent, EventQueue};
use crate::provider::{DataChannelHandle, ReadyState};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Attribute values captured at the instant the handle is released.
///
/// Defaults (all zero/empty/unset) apply until the capture happens; the
/// capture happens exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Provider-assigned channel id
    pub id: u16,
    /// Channel label
    pub label: String,
    /// Subprotocol name
    pub protocol: String,
    /// Ordered delivery flag
    pub ordered: bool,
    /// Out-of-band negotiation flag
    pub negotiated: bool,
    /// Retransmit limit, if configured
    pub max_retransmits: Option<u16>,
    /// Packet lifetime limit, if configured
    pub max_packet_life_time: Option<u16>,
    /// Last observed buffered amount
    pub buffered_amount: u64,
}

impl ChannelSnapshot {
    /// Read every attribute from a still-valid handle
    fn capture(handle: &dyn DataChannelHandle) -> Self {
        Self {
            id: handle.id(),
            label: handle.label(),
            protocol: handle.protocol(),
            ordered: handle.ordered(),
            negotiated: handle.negotiated(),
            max_retransmits: handle.max_retransmits(),
            max_packet_life_time: handle.max_packet_life_time(),
            buffered_amount: handle.buffered_amount(),
        }
    }
}

/// State shared across the thread boundary for one channel.
pub(crate) struct ChannelCore {
    /// The provider handle. `Some → None` is one-way and happens exactly
    /// once, in [`detach`](Self::detach).
    handle: RwLock<Option<Arc<dyn DataChannelHandle>>>,
    snapshot: Mutex<ChannelSnapshot>,
    pub(crate) queue: EventQueue,
}

impl ChannelCore {
    pub(crate) fn new(handle: Arc<dyn DataChannelHandle>) -> Arc<Self> {
        Arc::new(Self {
            handle: RwLock::new(Some(handle)),
            snapshot: Mutex::new(ChannelSnapshot::default()),
            queue: EventQueue::new(),
        })
    }

    /// Current handle, if not yet released
    pub(crate) fn handle(&self) -> Option<Arc<dyn DataChannelHandle>> {
        self.handle.read().clone()
    }

    /// Copy of the cached snapshot
    pub(crate) fn snapshot(&self) -> ChannelSnapshot {
        self.snapshot.lock().clone()
    }

    /// Release the handle: capture the snapshot while the handle is still
    /// valid, unregister, then drop the bridge's reference.
    ///
    /// Returns `true` if this call performed the release, `false` if the
    /// handle was already gone.
    pub(crate) fn detach(&self) -> bool {
        let mut slot = self.handle.write();
        let Some(handle) = slot.take() else {
            return false;
        };
        *self.snapshot.lock() = ChannelSnapshot::capture(handle.as_ref());
        handle.unregister_observer();
        debug!(id = handle.id(), "released data channel handle");
        true
    }

    /// Producer-side entry: a state notification arrived.
    ///
    /// `Closed` runs the release sequence before the event is queued, so
    /// the snapshot is in place by the time the transition becomes
    /// consumer-visible.
    pub(crate) fn state_changed(&self, state: ReadyState) {
        if state == ReadyState::Closed {
            self.detach();
        }
        self.queue.push(ChannelEvent::StateChange(state));
    }

    /// Producer-side entry: a message arrived
    pub(crate) fn message_received(&self, data: Bytes, is_binary: bool) {
        self.queue.push(ChannelEvent::Message { data, is_binary });
    }
}
