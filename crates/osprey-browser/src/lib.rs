pub mod cdp;
pub mod classify;
pub mod error;
pub mod probes;
pub mod readiness;
pub mod resolve;
pub mod session;

pub use cdp::{CdpTransport, TargetInfo};
pub use classify::{ModeFacts, classify, classify_page};
pub use error::{Error, Result};
pub use readiness::{
    ConvergenceTracker, Outcome, ReadinessDetector, ReadinessSample, SelectorWait, Signals,
};
pub use resolve::{ContainerInfo, Discriminator, ElementMatch, ElementResolver, Resolution};
pub use session::Session;
