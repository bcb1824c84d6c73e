//! In-memory backends for every Vigil storage trait.
//!
//! The alert table uses a papaya lock-free map keyed by canonical
//! external id. These backends are the default profile for local runs
//! and the fixtures for engine tests; a database-backed crate can
//! replace them behind the same traits.

pub mod alerts;
pub mod deliveries;
pub mod directory;
pub mod entitlements;

pub use alerts::InMemoryAlertStore;
pub use deliveries::InMemoryDeliveryStore;
pub use directory::{InMemoryChannelStore, InMemoryRecipientStore, InMemoryZoneStore};
pub use entitlements::StaticEntitlements;
