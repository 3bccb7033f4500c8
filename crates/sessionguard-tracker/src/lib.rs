mod analytics;
mod hit;
mod traits;
mod transport;

pub use analytics::AnalyticsTracker;
pub use hit::{build_model, HitModel, SendCall, PAGEVIEW};
pub use traits::{DispatchTask, Tracker, TrackerError};
pub use transport::{MemoryTransport, Transport};
