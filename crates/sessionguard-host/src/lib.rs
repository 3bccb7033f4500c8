//! # sessionguard-host
//!
//! The parts of the hosting environment a session guard observes: the page
//! visibility signal and a wall clock.
//!
//! ## Key Types
//!
//! - [`VisibilityHost`] - Current visibility state plus change listeners
//! - [`Document`] - In-memory visibility signal
//! - [`Clock`] - Millisecond wall clock ([`SystemClock`], [`ManualClock`])

mod clock;
mod visibility;

pub use clock::{Clock, ManualClock, SystemClock};
pub use visibility::{Document, ListenerId, VisibilityHost, VisibilityListener, VisibilityState};
