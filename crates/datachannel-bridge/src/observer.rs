//! Pre-adoption channel observer
//!
//! A [`ChannelObserver`] attaches to a handle before any consumer-side
//! wrapper exists, so state transitions and messages that arrive early are
//! buffered instead of lost. Exactly one [`ChannelProxy`] later adopts the
//! observer, taking over its queue and registration.
//!
//! [`ChannelProxy`]: crate::ChannelProxy

use crate::core::ChannelCore;
use crate::error::{BridgeError, Result};
use crate::provider::{DataChannelHandle, FactoryHandle, HandleObserver, ReadyState};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Buffers provider events for a channel that has no proxy yet.
pub struct ChannelObserver {
    core: Arc<ChannelCore>,
    factory: Arc<dyn FactoryHandle>,
    adopted: AtomicBool,
}

impl std::fmt::Debug for ChannelObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelObserver").finish_non_exhaustive()
    }
}

impl ChannelObserver {
    /// Register as the sole observer of `handle`.
    ///
    /// Fails with [`BridgeError::AlreadyRegistered`] if the provider
    /// already has an observer on this handle. The returned observer keeps
    /// `factory` alive until it is adopted or torn down.
    pub fn attach(
        handle: Arc<dyn DataChannelHandle>,
        factory: Arc<dyn FactoryHandle>,
    ) -> Result<Arc<Self>> {
        let id = handle.id();
        let observer = Arc::new(Self {
            core: ChannelCore::new(Arc::clone(&handle)),
            factory,
            adopted: AtomicBool::new(false),
        });
        let registration: Arc<dyn HandleObserver> = observer.clone();
        handle.register_observer(registration)?;
        debug!(id, "channel observer attached");
        Ok(observer)
    }

    /// Teardown notification from the owning connection.
    ///
    /// Runs the snapshot-capture-then-release sequence proactively and
    /// queues the terminal transition, since the provider notification will
    /// never arrive.
    pub fn on_connection_closed(&self) {
        if self.core.detach() {
            self.core.state_changed(ReadyState::Closed);
        }
    }

    /// Mark the observer adopted; only the first caller succeeds
    pub(crate) fn mark_adopted(&self) -> Result<()> {
        if self.adopted.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::invalid_state(
                "channel observer was already adopted",
            ));
        }
        Ok(())
    }

    pub(crate) fn core(&self) -> &Arc<ChannelCore> {
        &self.core
    }

    pub(crate) fn factory(&self) -> &Arc<dyn FactoryHandle> {
        &self.factory
    }
}

impl HandleObserver for ChannelObserver {
    fn on_state_change(&self, state: ReadyState) {
        self.core.state_changed(state);
    }

    fn on_message(&self, data: Bytes, is_binary: bool) {
        self.core.message_received(data, is_binary);
    }
}
