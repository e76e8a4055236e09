//! Single-consumer event dispatch
//!
//! The [`Dispatcher`] drains the channel's event queue and invokes the
//! consumer's handlers, one event at a time, in arrival order. Delivery
//! happens either on the consumer's own thread via
//! [`pump`](Dispatcher::pump) or on a dedicated event-loop task spawned by
//! [`spawn_loop`](Dispatcher::spawn_loop); a delivery lock keeps the two
//! paths from ever interleaving.

use crate::core::ChannelCore;
use crate::error::{BridgeError, Result};
use crate::events::ChannelEvent;
use crate::provider::ReadyState;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Consumer-side preference for how binary frames are represented.
///
/// Purely a consumer setting; the underlying channel is unaware of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryType {
    /// Deliver binary frames as a plain byte buffer
    #[default]
    ArrayBuffer,
    /// Deliver binary frames as an opaque blob reference
    Blob,
}

impl BinaryType {
    /// String form of the preference
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryType::ArrayBuffer => "arraybuffer",
            BinaryType::Blob => "blob",
        }
    }
}

impl std::fmt::Display for BinaryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BinaryType {
    type Err = BridgeError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "arraybuffer" => Ok(BinaryType::ArrayBuffer),
            "blob" => Ok(BinaryType::Blob),
            other => Err(BridgeError::invalid_argument(format!(
                "unknown binaryType '{}', expected 'arraybuffer' or 'blob'",
                other
            ))),
        }
    }
}

/// Payload of a message notification.
#[derive(Debug, Clone)]
pub enum MessageData {
    /// UTF-8 text frame
    Text(String),
    /// Binary frame, exactly the original payload length
    Binary {
        /// Frame bytes
        data: Bytes,
        /// The proxy's representation preference at delivery time
        binary_type: BinaryType,
    },
}

/// Handler for state-change notifications
pub type StateChangeHandler = Arc<dyn Fn(ReadyState) + Send + Sync>;

/// Handler for message notifications
pub type MessageHandler = Arc<dyn Fn(MessageData) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    state_change: Vec<StateChangeHandler>,
    message: Vec<MessageHandler>,
}

/// Delivers queued events to the consumer, preserving arrival order.
pub(crate) struct Dispatcher {
    core: Arc<ChannelCore>,
    handlers: Mutex<Handlers>,
    binary_type: RwLock<BinaryType>,
    /// Serializes delivery so concurrent `pump` callers cannot interleave
    delivery: Mutex<()>,
    /// Set once `Closed` has been delivered; terminal
    stopped: AtomicBool,
    /// Event loop spawned flag
    running: AtomicBool,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub(crate) fn new(core: Arc<ChannelCore>) -> Arc<Self> {
        Arc::new(Self {
            core,
            handlers: Mutex::new(Handlers::default()),
            binary_type: RwLock::new(BinaryType::default()),
            delivery: Mutex::new(()),
            stopped: AtomicBool::new(false),
            running: AtomicBool::new(false),
            loop_handle: Mutex::new(None),
        })
    }

    pub(crate) fn on_state_change(&self, handler: StateChangeHandler) {
        self.handlers.lock().state_change.push(handler);
    }

    pub(crate) fn on_message(&self, handler: MessageHandler) {
        self.handlers.lock().message.push(handler);
    }

    pub(crate) fn binary_type(&self) -> BinaryType {
        *self.binary_type.read()
    }

    pub(crate) fn set_binary_type(&self, binary_type: BinaryType) {
        *self.binary_type.write() = binary_type;
    }

    /// Drain every queued event on the calling thread.
    ///
    /// Returns the number of events delivered.
    pub(crate) fn pump(&self) -> usize {
        let _guard = self.delivery.lock();
        let mut delivered = 0;
        while let Some(event) = self.core.queue.pop() {
            self.deliver(event);
            delivered += 1;
        }
        delivered
    }

    /// Spawn the event-loop task. Idempotent; requires a tokio runtime.
    pub(crate) fn spawn_loop(this: &Arc<Self>) {
        if this.running.swap(true, Ordering::SeqCst) {
            return; // Already running
        }
        let dispatcher = Arc::clone(this);
        let handle = tokio::spawn(async move {
            dispatcher.run().await;
        });
        *this.loop_handle.lock() = Some(handle);
    }

    /// Stop the event loop without delivering further events
    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.core.queue.wake();
    }

    async fn run(&self) {
        loop {
            self.pump();
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            self.core.queue.wait().await;
        }
        debug!("channel event loop stopped");
    }

    /// Invoke the consumer notification for one event.
    ///
    /// Runs with the delivery lock held; handler lists are cloned out of
    /// their lock so a handler may register further handlers.
    fn deliver(&self, event: ChannelEvent) {
        if self.stopped.load(Ordering::SeqCst) {
            warn!(event = event.name(), "event discarded after terminal state");
            return;
        }
        match event {
            ChannelEvent::StateChange(state) => {
                // The snapshot must be cached before `Closed` becomes
                // consumer-visible; a no-op if the producer side already
                // ran the release sequence.
                if state == ReadyState::Closed {
                    self.core.detach();
                }
                // Only the externally observable transitions are notified.
                if matches!(state, ReadyState::Open | ReadyState::Closed) {
                    debug!(state = %state, "delivering state change");
                    let handlers: Vec<StateChangeHandler> =
                        self.handlers.lock().state_change.clone();
                    for handler in handlers {
                        handler(state);
                    }
                }
                if state == ReadyState::Closed {
                    self.stopped.store(true, Ordering::SeqCst);
                    self.core.queue.wake();
                }
            }
            ChannelEvent::Message { data, is_binary } => {
                let payload = if is_binary {
                    MessageData::Binary {
                        data,
                        binary_type: self.binary_type(),
                    }
                } else {
                    MessageData::Text(String::from_utf8_lossy(&data).into_owned())
                };
                let handlers: Vec<MessageHandler> = self.handlers.lock().message.clone();
                for handler in handlers {
                    handler(payload.clone());
                }
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(handle) = self.loop_handle.lock().take() {
            handle.abort();
        }
    }
}
