use std::rc::Rc;
use thiserror::Error;

use crate::{HitModel, SendCall};

/// Errors that can occur while building or transmitting a hit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Invalid send command: first argument must be a hit type or a fields object, got {0}")]
    InvalidCommand(String),

    #[error("Send command is missing a hitType")]
    MissingHitType,

    #[error("Hit delivery failed: {0}")]
    DeliveryFailed(String),
}

/// The low-level transmission step. Receives the fully built hit model.
pub type DispatchTask = Rc<dyn Fn(&HitModel) -> Result<(), TrackerError>>;

/// The core abstraction for an analytics tracker
///
/// Trackers are single-threaded and use interior mutability, so every
/// operation takes `&self` and may be re-entered from inside a dispatch task.
pub trait Tracker {
    /// Human-readable name of the tracker (e.g., "t0")
    fn name(&self) -> &str;

    /// Build a hit from the command arguments and run it through the
    /// dispatch task.
    fn send(&self, call: SendCall) -> Result<(), TrackerError>;

    /// The dispatch task currently installed
    fn dispatch_task(&self) -> DispatchTask;

    /// Replace the dispatch task. Takes effect for every subsequent hit.
    fn set_dispatch_task(&self, task: DispatchTask);
}
