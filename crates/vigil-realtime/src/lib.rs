//! Live connection registry and real-time broadcast.
//!
//! The [`ConnectionManager`] is constructed once at process start and
//! handed to the transport layer and the alert fanout. It owns every
//! live session exclusively: sessions are created on connect, mutated
//! by subscribe messages, and destroyed on disconnect or on the first
//! failed write (self-healing registry).

pub mod manager;
pub mod protocol;
pub mod session;

pub use manager::{ConnectionManager, ConnectionStats};
pub use protocol::{ClientMessage, LocationSubscription, ServerMessage};
pub use session::{SessionId, SessionSink, TransportError};
