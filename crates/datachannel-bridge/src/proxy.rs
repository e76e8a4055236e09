//! Consumer-facing channel proxy
//!
//! A [`ChannelProxy`] is created by adopting a [`ChannelObserver`]: the
//! observer's queue and provider registration transfer to the proxy, any
//! buffered events replay through the proxy's dispatch path, and the
//! observer is discarded. Construction is triggered by the provider side of
//! the system, never by consumer code.

use crate::core::{ChannelCore, ChannelSnapshot};
use crate::dispatch::{BinaryType, Dispatcher, MessageData};
use crate::error::{BridgeError, Result};
use crate::observer::ChannelObserver;
use crate::provider::{FactoryHandle, HandleObserver, ReadyState};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Producer-side sink registered with the handle once a proxy exists.
///
/// Pushes into the same core the pre-adoption observer buffered into, so
/// the registration handoff cannot drop or reorder events.
struct ProxySink {
    core: Arc<ChannelCore>,
}

impl HandleObserver for ProxySink {
    fn on_state_change(&self, state: ReadyState) {
        self.core.state_changed(state);
    }

    fn on_message(&self, data: Bytes, is_binary: bool) {
        self.core.message_received(data, is_binary);
    }
}

/// The consumer-visible data channel object.
///
/// While the underlying handle is alive, attribute getters read live
/// values; after the channel reaches `Closed` (or the owning connection is
/// torn down) they read the snapshot captured at the instant of release.
pub struct ChannelProxy {
    core: Arc<ChannelCore>,
    dispatcher: Arc<Dispatcher>,
    /// Keeps the owning factory alive for the proxy's lifetime
    _factory: Arc<dyn FactoryHandle>,
}

impl std::fmt::Debug for ChannelProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProxy").finish_non_exhaustive()
    }
}

impl ChannelProxy {
    /// Adopt a pre-existing observer.
    ///
    /// Takes over the observer's queue and provider registration; buffered
    /// events are already in the proxy's dispatch path and deliver, in
    /// order, ahead of any live event. Each observer can be adopted exactly
    /// once.
    pub fn adopt(observer: &Arc<ChannelObserver>) -> Result<Arc<Self>> {
        observer.mark_adopted()?;

        let core = Arc::clone(observer.core());
        let proxy = Arc::new(Self {
            core: Arc::clone(&core),
            dispatcher: Dispatcher::new(Arc::clone(&core)),
            _factory: Arc::clone(observer.factory()),
        });

        // Transfer the registration. The provider swaps atomically and both
        // sinks feed the same queue, so no event is lost around the handoff.
        if let Some(handle) = core.handle() {
            handle.swap_observer(Arc::new(ProxySink {
                core: Arc::clone(&core),
            }));
        }
        debug!(buffered = core.queue.len(), "channel proxy adopted observer");
        Ok(proxy)
    }

    /// Register a handler for the observable state transitions
    /// (`open` and `closed`)
    pub fn on_state_change<F>(&self, handler: F)
    where
        F: Fn(ReadyState) + Send + Sync + 'static,
    {
        self.dispatcher.on_state_change(Arc::new(handler));
    }

    /// Register a handler for inbound messages
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(MessageData) + Send + Sync + 'static,
    {
        self.dispatcher.on_message(Arc::new(handler));
    }

    /// Spawn the event-loop task that delivers notifications.
    ///
    /// Idempotent. Handlers registered after the loop starts miss any
    /// event already delivered, so register them first.
    pub fn start(&self) {
        Dispatcher::spawn_loop(&self.dispatcher);
    }

    /// Deliver every queued event on the calling thread, for hosts that
    /// drive dispatch from their own loop instead of [`start`](Self::start).
    ///
    /// Returns the number of events delivered.
    pub fn pump(&self) -> usize {
        self.dispatcher.pump()
    }

    /// Send a UTF-8 text frame.
    ///
    /// Fails with an `InvalidState` error unless the channel is `Open` and
    /// the handle is still held.
    pub fn send_text(&self, text: &str) -> Result<()> {
        self.send_frame(Bytes::copy_from_slice(text.as_bytes()), false)
    }

    /// Send a binary frame.
    ///
    /// `data` may be a sliced view; only the viewed byte range is sent and
    /// the backing buffer is not copied.
    pub fn send_binary(&self, data: Bytes) -> Result<()> {
        self.send_frame(data, true)
    }

    fn send_frame(&self, data: Bytes, is_binary: bool) -> Result<()> {
        let Some(handle) = self.core.handle() else {
            return Err(BridgeError::invalid_state("readyState is not 'open'"));
        };
        if handle.ready_state() != ReadyState::Open {
            return Err(BridgeError::invalid_state("readyState is not 'open'"));
        }
        debug!(len = data.len(), is_binary, "sending frame");
        handle.send(data, is_binary)
    }

    /// Request closure. Idempotent: a released handle makes this a no-op.
    ///
    /// The `closed` transition still arrives asynchronously from the
    /// provider; nothing changes synchronously.
    pub fn close(&self) {
        if let Some(handle) = self.core.handle() {
            debug!(id = handle.id(), "closing data channel");
            handle.close();
        }
    }

    /// Teardown notification from the owning connection.
    ///
    /// If the channel has not yet closed, runs the snapshot-capture-then-
    /// release sequence and queues the terminal transition, since the
    /// provider notification will never arrive.
    pub fn on_connection_closed(&self) {
        if self.core.detach() {
            self.core.state_changed(ReadyState::Closed);
        }
    }

    /// Provider-assigned channel id
    pub fn id(&self) -> u16 {
        match self.core.handle() {
            Some(handle) => handle.id(),
            None => self.core.snapshot().id,
        }
    }

    /// Channel label
    pub fn label(&self) -> String {
        match self.core.handle() {
            Some(handle) => handle.label(),
            None => self.core.snapshot().label,
        }
    }

    /// Subprotocol name
    pub fn protocol(&self) -> String {
        match self.core.handle() {
            Some(handle) => handle.protocol(),
            None => self.core.snapshot().protocol,
        }
    }

    /// Ordered delivery flag
    pub fn ordered(&self) -> bool {
        match self.core.handle() {
            Some(handle) => handle.ordered(),
            None => self.core.snapshot().ordered,
        }
    }

    /// Out-of-band negotiation flag
    pub fn negotiated(&self) -> bool {
        match self.core.handle() {
            Some(handle) => handle.negotiated(),
            None => self.core.snapshot().negotiated,
        }
    }

    /// Retransmit limit, if configured
    pub fn max_retransmits(&self) -> Option<u16> {
        match self.core.handle() {
            Some(handle) => handle.max_retransmits(),
            None => self.core.snapshot().max_retransmits,
        }
    }

    /// Packet lifetime limit, if configured
    pub fn max_packet_life_time(&self) -> Option<u16> {
        match self.core.handle() {
            Some(handle) => handle.max_packet_life_time(),
            None => self.core.snapshot().max_packet_life_time,
        }
    }

    /// Bytes buffered by the provider, or the last value observed before
    /// the handle was released
    pub fn buffered_amount(&self) -> u64 {
        match self.core.handle() {
            Some(handle) => handle.buffered_amount(),
            None => self.core.snapshot().buffered_amount,
        }
    }

    /// Current state; `Closed` once the handle has been released
    pub fn ready_state(&self) -> ReadyState {
        match self.core.handle() {
            Some(handle) => handle.ready_state(),
            None => ReadyState::Closed,
        }
    }

    /// Channel priority. The provider does not negotiate per-channel
    /// priority, so a fixed value is reported unconditionally.
    pub fn priority(&self) -> &'static str {
        "high"
    }

    /// Current binary representation preference
    pub fn binary_type(&self) -> BinaryType {
        self.dispatcher.binary_type()
    }

    /// Set the binary representation preference.
    ///
    /// An unrecognized value fails with a `TypeError`-class error and
    /// leaves the previous value unchanged.
    pub fn set_binary_type(&self, value: &str) -> Result<()> {
        let binary_type: BinaryType = value.parse()?;
        self.dispatcher.set_binary_type(binary_type);
        Ok(())
    }

    /// Copy of the attribute snapshot; all defaults until the handle has
    /// been released
    pub fn snapshot(&self) -> ChannelSnapshot {
        self.core.snapshot()
    }
}

impl Drop for ChannelProxy {
    fn drop(&mut self) {
        // Destruction always unregisters any active observation and
        // releases every held reference, whatever state the channel is in.
        self.core.detach();
        self.dispatcher.stop();
    }
}
