pub mod config;
pub mod error;
pub mod lease;
pub mod mode;
pub mod snapshot;

pub use config::{AutomationConfig, TimeoutPolicy};
pub use error::{Error, Result};
pub use lease::{Lease, LeaseManager, LeaseStatus};
pub use mode::PageMode;
pub use snapshot::{DiffReport, SnapshotKey, SnapshotStore};
