use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

/// Visibility state reported by the host
///
/// Hosts may report states beyond `visible`/`hidden` (e.g. `prerender`);
/// those are kept verbatim in [`VisibilityState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VisibilityState {
    #[default]
    Visible,
    Hidden,
    Other(String),
}

impl VisibilityState {
    pub fn as_str(&self) -> &str {
        match self {
            VisibilityState::Visible => "visible",
            VisibilityState::Hidden => "hidden",
            VisibilityState::Other(state) => state,
        }
    }
}

impl fmt::Display for VisibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for VisibilityState {
    fn from(state: &str) -> Self {
        match state {
            "visible" => VisibilityState::Visible,
            "hidden" => VisibilityState::Hidden,
            other => VisibilityState::Other(other.to_string()),
        }
    }
}

impl Serialize for VisibilityState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VisibilityState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = String::deserialize(deserializer)?;
        Ok(VisibilityState::from(state.as_str()))
    }
}

/// Handle returned when a listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback run on every visibility change with the new state
pub type VisibilityListener = Rc<dyn Fn(&VisibilityState)>;

/// Global visibility signal of the hosting environment
pub trait VisibilityHost {
    /// Whether listeners can be attached at all. Headless hosts return false.
    fn supports_listeners(&self) -> bool {
        true
    }

    fn visibility_state(&self) -> VisibilityState;

    fn add_visibility_listener(&self, listener: VisibilityListener) -> ListenerId;

    /// Detach a listener. Returns false if it was not attached.
    fn remove_visibility_listener(&self, id: ListenerId) -> bool;
}

/// In-memory visibility signal
pub struct Document {
    state: RefCell<VisibilityState>,
    listeners: RefCell<Vec<(ListenerId, VisibilityListener)>>,
    next_id: Cell<u64>,
    listeners_supported: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(VisibilityState::Visible),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            listeners_supported: true,
        }
    }

    /// A document without listener support, like a non-browser context
    pub fn headless() -> Self {
        Self {
            listeners_supported: false,
            ..Self::new()
        }
    }

    /// Set the visibility state and notify listeners.
    /// Returns false (and notifies nobody) if the state did not change.
    pub fn set_visibility_state(&self, state: VisibilityState) -> bool {
        if *self.state.borrow() == state {
            return false;
        }
        *self.state.borrow_mut() = state.clone();

        // Snapshot so listeners may detach themselves while being notified
        let listeners: Vec<VisibilityListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        trace!(state = %state, listeners = listeners.len(), "Visibility changed");
        for listener in listeners {
            listener(&state);
        }
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl VisibilityHost for Document {
    fn supports_listeners(&self) -> bool {
        self.listeners_supported
    }

    fn visibility_state(&self) -> VisibilityState {
        self.state.borrow().clone()
    }

    fn add_visibility_listener(&self, listener: VisibilityListener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove_visibility_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}
