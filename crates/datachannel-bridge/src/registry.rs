//! Channel registry
//!
//! The connection layer keeps one bridge object per underlying channel and
//! must be able to fan its own teardown out to all of them. The registry
//! holds weak references keyed by channel id, so it never extends a
//! channel's lifetime; entries whose object is gone are purged on access.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::observer::ChannelObserver;
use crate::proxy::ChannelProxy;

/// Bridge objects that consume the connection-teardown notification.
pub trait TeardownListener: Send + Sync {
    /// The owning connection is being destroyed
    fn on_connection_closed(&self);
}

impl TeardownListener for ChannelObserver {
    fn on_connection_closed(&self) {
        ChannelObserver::on_connection_closed(self);
    }
}

impl TeardownListener for ChannelProxy {
    fn on_connection_closed(&self) {
        ChannelProxy::on_connection_closed(self);
    }
}

/// Registry of live bridge objects for one connection, keyed by channel id.
pub struct ChannelRegistry<T: ?Sized + TeardownListener> {
    channels: Mutex<HashMap<u16, Weak<T>>>,
}

impl<T: ?Sized + TeardownListener> ChannelRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Register `channel` under `id`, replacing any previous entry.
    ///
    /// Adoption re-inserts under the same id, swapping the observer entry
    /// for the proxy entry.
    pub fn insert(&self, id: u16, channel: &Arc<T>) {
        debug!(id, "registering channel");
        self.channels.lock().insert(id, Arc::downgrade(channel));
    }

    /// Look up the live object for `id`, if any
    pub fn get(&self, id: u16) -> Option<Arc<T>> {
        let mut channels = self.channels.lock();
        match channels.get(&id).and_then(Weak::upgrade) {
            Some(channel) => Some(channel),
            None => {
                channels.remove(&id);
                None
            }
        }
    }

    /// Remove the entry for `id`. Returns whether an entry was present.
    pub fn remove(&self, id: u16) -> bool {
        self.channels.lock().remove(&id).is_some()
    }

    /// Whether a live object is registered for `id`
    pub fn contains(&self, id: u16) -> bool {
        self.get(id).is_some()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.purge();
        self.channels.lock().len()
    }

    /// Whether the registry has no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all live entries
    pub fn channel_ids(&self) -> Vec<u16> {
        self.purge();
        self.channels.lock().keys().copied().collect()
    }

    /// Deliver the connection-teardown notification to every live channel
    /// and clear the registry.
    pub fn close_all(&self) {
        let entries: Vec<Weak<T>> = {
            let mut channels = self.channels.lock();
            channels.drain().map(|(_, weak)| weak).collect()
        };
        let mut notified = 0usize;
        for weak in entries {
            if let Some(channel) = weak.upgrade() {
                channel.on_connection_closed();
                notified += 1;
            }
        }
        debug!(notified, "connection teardown fanned out to channels");
    }

    fn purge(&self) {
        self.channels
            .lock()
            .retain(|_, weak| weak.strong_count() > 0);
    }
}

impl<T: ?Sized + TeardownListener> Default for ChannelRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
