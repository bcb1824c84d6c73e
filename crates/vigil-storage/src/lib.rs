//! Storage traits for the Vigil alert engine.
//!
//! The engine consumes persistence through these narrow contracts; a
//! backend implements them (see `vigil-db-memory` for the in-memory
//! one). Implementations must be thread-safe (`Send + Sync`), and
//! alert upserts must be atomic per canonical external id.

pub mod error;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use traits::{
    AlertStore, ChannelStore, DeliveryStore, EntitlementChecker, RecipientStore, ZoneStore,
};
pub use types::{
    ChannelKind, DeliveryRecord, DeliveryStats, DeliveryStatus, Feature, NotificationChannel,
    QuietHours, Recipient, UpsertOutcome, Zone,
};
