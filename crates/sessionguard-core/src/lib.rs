//! # sessionguard-core
//!
//! Keeps analytics sessions honest across idle periods.
//!
//! [`SessionGuard`] decorates a [`Tracker`](sessionguard_tracker::Tracker):
//! it records the time of every transmitted hit, and when a new hit is
//! requested after more than `session_timeout_minutes` of inactivity it sends
//! a virtual pageview first. It also turns page visibility changes into
//! "Page Visibility" events, or into a virtual pageview when the page becomes
//! visible again after the session expired.
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use sessionguard_core::{GuardOptions, SessionGuard};
//! use sessionguard_host::Document;
//! use sessionguard_tracker::{AnalyticsTracker, MemoryTransport, SendCall, Tracker};
//!
//! let tracker = Rc::new(AnalyticsTracker::new(Rc::new(MemoryTransport::new())));
//! let guard = SessionGuard::new(tracker, Rc::new(Document::new()), GuardOptions::default());
//! guard.send(SendCall::new("event").arg("Video").arg("play"))?;
//! guard.remove();
//! ```

mod error;
mod guard;
mod options;
mod timeout;

pub use error::GuardError;
pub use guard::SessionGuard;
pub use options::{GuardOptions, DEFAULT_SESSION_TIMEOUT_MINUTES};
pub use timeout::{elapsed_minutes, session_has_timed_out};
