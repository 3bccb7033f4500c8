use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::GuardError;

pub const DEFAULT_SESSION_TIMEOUT_MINUTES: f64 = 30.0;

/// Construction-time options of a session guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardOptions {
    /// Idle minutes after which the session counts as expired
    pub session_timeout_minutes: f64,
    /// Fields merged into every virtual pageview the guard sends
    pub virtual_pageview_fields: Map<String, Value>,
    /// Unrecognized options, kept as given and otherwise unused
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for GuardOptions {
    fn default() -> Self {
        Self {
            session_timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            virtual_pageview_fields: Map::new(),
            extra: Map::new(),
        }
    }
}

impl GuardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_timeout_minutes(mut self, minutes: f64) -> Self {
        self.session_timeout_minutes = minutes;
        self
    }

    pub fn with_virtual_pageview_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.virtual_pageview_fields
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_virtual_pageview_fields(mut self, fields: Map<String, Value>) -> Self {
        self.virtual_pageview_fields = fields;
        self
    }

    /// Check values the guard cannot work with
    pub fn validate(&self) -> Result<(), GuardError> {
        let minutes = self.session_timeout_minutes;
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(GuardError::InvalidSessionTimeout(minutes));
        }
        Ok(())
    }
}
