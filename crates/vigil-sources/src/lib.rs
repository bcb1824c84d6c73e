//! External feed adapters and the periodic sync scheduler.
//!
//! Each adapter turns one upstream feed into canonical [`vigil_core::Alert`]s:
//! `fetch` performs the outbound call, `convert` applies the feed's
//! severity/category vocabulary with conservative defaults, and the
//! provided `sync` upserts by canonical external id and publishes
//! lifecycle events. Failures are isolated per adapter and per record;
//! one broken feed never takes down its siblings.

pub mod adapter;
pub mod crime;
pub mod error;
pub mod region;
pub mod scheduler;
pub mod seismic;
pub mod volcano;
pub mod weather;

pub use adapter::{SourceAdapter, SyncContext, SyncSummary};
pub use crime::CrimeAdapter;
pub use error::SourceError;
pub use scheduler::{SchedulerHandle, SchedulerState, SyncScheduler, SyncSchedulerConfig};
pub use seismic::SeismicAdapter;
pub use volcano::VolcanoAdapter;
pub use weather::WeatherAdapter;
