//! Notification dispatch engine.
//!
//! `dispatch` resolves the recipients an alert affects, runs each one
//! through the layered eligibility filters, enumerates their eligible
//! channels and fans the sends out concurrently, recording every
//! outcome. A dispatch never raises: individual failures are recorded
//! and logged, siblings continue.

pub mod engine;
pub mod error;
pub mod filters;
pub mod queue;
pub mod render;
pub mod resolve;
pub mod senders;

pub use engine::{DispatchOutcome, DispatchReport, Dispatcher, DispatcherConfig};
pub use error::DispatchError;
pub use queue::{DispatchQueue, DispatchSender};
pub use render::RenderedContent;
pub use senders::{ChannelSender, EmailSender, SendResult, SmsSender, VoiceSender};
