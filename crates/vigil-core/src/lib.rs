pub mod alert;
pub mod error;
pub mod events;
pub mod time;

pub use alert::{Alert, Category, Severity};
pub use error::{CoreError, Result};
pub use events::{AlertBroadcaster, AlertEvent, AlertEventKind};
pub use time::{format_rfc3339, now_utc};
