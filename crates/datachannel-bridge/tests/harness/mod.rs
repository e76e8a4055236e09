//! Test harness: a scripted in-process channel provider
//!
//! [`MockChannel`] stands in for the external networking stack. Tests fire
//! provider notifications (from the test thread or a spawned producer
//! thread) and inspect what the bridge handed back to the provider: sent
//! frames, close requests, observer registrations.

#![allow(dead_code)]

use bytes::Bytes;
use datachannel_bridge::{
    BridgeError, DataChannelHandle, FactoryHandle, HandleObserver, ReadyState, Result,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Initialize tracing for tests (call once per test)
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();
}

/// Stand-in for the owning connection/factory object
pub struct MockFactory;

impl FactoryHandle for MockFactory {}

/// A frame the bridge handed to the provider for transmission
#[derive(Debug, Clone)]
pub struct SentFrame {
    pub data: Bytes,
    pub is_binary: bool,
}

/// Static channel attributes for a [`MockChannel`]
#[derive(Debug, Clone)]
pub struct MockChannelSpec {
    pub id: u16,
    pub label: String,
    pub protocol: String,
    pub ordered: bool,
    pub negotiated: bool,
    pub max_retransmits: Option<u16>,
    pub max_packet_life_time: Option<u16>,
}

impl Default for MockChannelSpec {
    fn default() -> Self {
        Self {
            id: 1,
            label: "data".to_string(),
            protocol: String::new(),
            ordered: true,
            negotiated: false,
            max_retransmits: None,
            max_packet_life_time: None,
        }
    }
}

/// Scripted provider-side channel
pub struct MockChannel {
    spec: MockChannelSpec,
    state: Mutex<ReadyState>,
    buffered_amount: AtomicU64,
    observer: Mutex<Option<Arc<dyn HandleObserver>>>,
    sent: Mutex<Vec<SentFrame>>,
    close_requests: AtomicUsize,
    unregister_count: AtomicUsize,
}

impl MockChannel {
    pub fn new(spec: MockChannelSpec) -> Arc<Self> {
        Arc::new(Self {
            spec,
            state: Mutex::new(ReadyState::Connecting),
            buffered_amount: AtomicU64::new(0),
            observer: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            close_requests: AtomicUsize::new(0),
            unregister_count: AtomicUsize::new(0),
        })
    }

    /// Move to `state` and notify the registered observer, the way the
    /// provider's networking thread does
    pub fn fire_state(&self, state: ReadyState) {
        *self.state.lock() = state;
        if let Some(observer) = self.current_observer() {
            observer.on_state_change(state);
        }
    }

    pub fn fire_open(&self) {
        self.fire_state(ReadyState::Open);
    }

    pub fn fire_closed(&self) {
        self.fire_state(ReadyState::Closed);
    }

    /// Deliver an inbound frame to the registered observer
    pub fn fire_message(&self, data: impl Into<Bytes>, is_binary: bool) {
        if let Some(observer) = self.current_observer() {
            observer.on_message(data.into(), is_binary);
        }
    }

    pub fn set_buffered_amount(&self, amount: u64) {
        self.buffered_amount.store(amount, Ordering::SeqCst);
    }

    pub fn has_observer(&self) -> bool {
        self.observer.lock().is_some()
    }

    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.sent.lock().clone()
    }

    pub fn close_requests(&self) -> usize {
        self.close_requests.load(Ordering::SeqCst)
    }

    pub fn unregister_count(&self) -> usize {
        self.unregister_count.load(Ordering::SeqCst)
    }

    fn current_observer(&self) -> Option<Arc<dyn HandleObserver>> {
        self.observer.lock().clone()
    }
}

impl DataChannelHandle for MockChannel {
    fn id(&self) -> u16 {
        self.spec.id
    }

    fn label(&self) -> String {
        self.spec.label.clone()
    }

    fn protocol(&self) -> String {
        self.spec.protocol.clone()
    }

    fn ordered(&self) -> bool {
        self.spec.ordered
    }

    fn negotiated(&self) -> bool {
        self.spec.negotiated
    }

    fn max_retransmits(&self) -> Option<u16> {
        self.spec.max_retransmits
    }

    fn max_packet_life_time(&self) -> Option<u16> {
        self.spec.max_packet_life_time
    }

    fn buffered_amount(&self) -> u64 {
        self.buffered_amount.load(Ordering::SeqCst)
    }

    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }

    fn send(&self, data: Bytes, is_binary: bool) -> Result<()> {
        if *self.state.lock() != ReadyState::Open {
            return Err(BridgeError::provider("send on a channel that is not open"));
        }
        self.sent.lock().push(SentFrame { data, is_binary });
        Ok(())
    }

    fn close(&self) {
        self.close_requests.fetch_add(1, Ordering::SeqCst);
        // Closure is asynchronous: the test script fires the state
        // transitions explicitly.
    }

    fn register_observer(&self, observer: Arc<dyn HandleObserver>) -> Result<()> {
        let mut slot = self.observer.lock();
        if slot.is_some() {
            return Err(BridgeError::AlreadyRegistered(self.spec.id));
        }
        *slot = Some(observer);
        Ok(())
    }

    fn swap_observer(&self, observer: Arc<dyn HandleObserver>) {
        *self.observer.lock() = Some(observer);
    }

    fn unregister_observer(&self) {
        if self.observer.lock().take().is_some() {
            self.unregister_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
