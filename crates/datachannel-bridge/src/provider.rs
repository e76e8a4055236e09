//! Channel provider interfaces
//!
//! The actual peer-to-peer data channel is owned by an external networking
//! stack. The bridge reaches it only through the traits in this module: a
//! handle for synchronous queries and primitives, and a two-method observer
//! the provider invokes from its own thread.

use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Data channel state
///
/// Transitions run `Connecting → Open → Closing → Closed` and are driven
/// exclusively by provider notifications. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Channel is being negotiated
    Connecting,
    /// Channel is open and ready for messages
    Open,
    /// Channel is closing
    Closing,
    /// Channel is closed
    Closed,
}

impl ReadyState {
    /// String form reported to the consumer environment
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw provider callbacks, invoked on the provider's networking thread.
///
/// Implementations must never block and must never touch consumer-side
/// objects; they translate each notification into a queued event.
pub trait HandleObserver: Send + Sync {
    /// The channel moved to `state`
    fn on_state_change(&self, state: ReadyState);

    /// A message arrived from the remote peer
    fn on_message(&self, data: Bytes, is_binary: bool);
}

/// Reference-counted access point to the provider's live channel object.
///
/// Accessors are synchronous and valid for as long as the handle is held.
/// The bridge keeps exactly one `Arc` reference and releases it exactly
/// once, when the channel reaches `Closed` or the owning connection is torn
/// down.
pub trait DataChannelHandle: Send + Sync {
    /// Provider-assigned channel id
    fn id(&self) -> u16;

    /// Channel label
    fn label(&self) -> String;

    /// Subprotocol name negotiated for the channel
    fn protocol(&self) -> String;

    /// Whether delivery is ordered
    fn ordered(&self) -> bool;

    /// Whether the channel was negotiated out of band
    fn negotiated(&self) -> bool;

    /// Retransmit limit for partially reliable delivery, if configured
    fn max_retransmits(&self) -> Option<u16>;

    /// Packet lifetime limit in milliseconds, if configured
    fn max_packet_life_time(&self) -> Option<u16>;

    /// Bytes queued by the provider but not yet handed to the transport
    fn buffered_amount(&self) -> u64;

    /// Current channel state
    fn ready_state(&self) -> ReadyState;

    /// Hand a frame to the provider for transmission.
    ///
    /// The provider owns buffering, chunking and flow control; the call
    /// queues and returns without blocking.
    fn send(&self, data: Bytes, is_binary: bool) -> Result<()>;

    /// Request closure. The resulting `Closed` transition arrives later as
    /// a state notification.
    fn close(&self);

    /// Register `observer` as the channel's sole observer.
    ///
    /// Providers reject a second registration with
    /// [`BridgeError::AlreadyRegistered`](crate::BridgeError::AlreadyRegistered);
    /// replacing an observer goes through [`swap_observer`](Self::swap_observer).
    fn register_observer(&self, observer: Arc<dyn HandleObserver>) -> Result<()>;

    /// Atomically replace the registered observer.
    ///
    /// No notification may be dropped around the swap: every event is
    /// delivered to either the old or the new observer, in order.
    fn swap_observer(&self, observer: Arc<dyn HandleObserver>);

    /// Remove the registered observer, if any
    fn unregister_observer(&self);
}

/// Keep-alive reference to the connection-layer object that owns the
/// channel provider.
///
/// Observers and proxies hold one strong reference for their whole lifetime
/// so the factory cannot be torn down while a channel binding is alive.
pub trait FactoryHandle: Send + Sync {}
