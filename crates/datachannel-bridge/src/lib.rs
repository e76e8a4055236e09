//! Cross-thread data channel bridge
//!
//! Exposes a peer-to-peer data channel, owned by a multi-threaded
//! networking stack, to a single-threaded consumer host. The channel
//! protocol itself belongs to the external provider; this crate owns the
//! event bridge and object-lifecycle protocol in between:
//!
//! - [`ChannelObserver`] attaches to a provider handle before any consumer
//!   wrapper exists and buffers early events.
//! - [`ChannelProxy`] adopts the observer (queue and registration transfer
//!   in one handoff), replays the buffered events in order, then receives
//!   live events directly.
//! - The dispatch path delivers every event exactly once, in arrival
//!   order, on a single execution context.
//! - When the channel reaches `closed` — or the owning connection is torn
//!   down first — the bridge captures an attribute snapshot from the
//!   still-valid handle, releases it exactly once, and answers all later
//!   attribute queries from the snapshot.
//!
//! # Example
//!
//! ```ignore
//! use datachannel_bridge::{ChannelObserver, ChannelProxy};
//!
//! // Provider side, as soon as the channel exists:
//! let observer = ChannelObserver::attach(handle, factory)?;
//!
//! // Consumer side, when the host wrapper is created:
//! let proxy = ChannelProxy::adopt(&observer)?;
//! proxy.on_message(|msg| println!("received: {:?}", msg));
//! proxy.on_state_change(|state| println!("state: {}", state));
//! proxy.start();
//!
//! proxy.send_text("hello")?;
//! proxy.close();
//! ```

#![warn(clippy::all)]

mod core;
mod dispatch;
mod error;
mod events;
mod observer;
mod provider;
mod proxy;
mod registry;

pub use crate::core::ChannelSnapshot;
pub use dispatch::{BinaryType, MessageData, MessageHandler, StateChangeHandler};
pub use error::{BridgeError, ErrorCode, Result};
pub use events::{ChannelEvent, EventQueue};
pub use observer::ChannelObserver;
pub use provider::{DataChannelHandle, FactoryHandle, HandleObserver, ReadyState};
pub use proxy::ChannelProxy;
pub use registry::{ChannelRegistry, TeardownListener};
