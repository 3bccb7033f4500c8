use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TrackerError;

/// Hit type of a page view
pub const PAGEVIEW: &str = "pageview";

/// Arguments of a single `send` command
///
/// The first argument is either a hit-type string (`"event"`) or a fields
/// object carrying a `hitType` key. Anything after it is free-form payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendCall {
    args: Vec<Value>,
}

impl SendCall {
    pub fn new(first: impl Into<Value>) -> Self {
        Self {
            args: vec![first.into()],
        }
    }

    pub fn from_args(args: Vec<Value>) -> Self {
        Self { args }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// A pageview carrying `fields` as its fields object
    pub fn pageview(fields: &Map<String, Value>) -> Self {
        Self::new(PAGEVIEW).arg(Value::Object(fields.clone()))
    }

    /// An event whose fields are given as a single object
    pub fn event(fields: Map<String, Value>) -> Self {
        Self::new("event").arg(Value::Object(fields))
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Hit type from the string form or from the object form's `hitType`
    pub fn hit_type(&self) -> Option<&str> {
        match self.args.first()? {
            Value::String(hit_type) => Some(hit_type),
            Value::Object(fields) => fields.get("hitType").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn is_pageview(&self) -> bool {
        self.hit_type() == Some(PAGEVIEW)
    }
}

/// A fully built hit, ready for transmission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HitModel {
    fields: Map<String, Value>,
}

impl HitModel {
    pub fn new(hit_type: &str) -> Self {
        let mut model = Self::default();
        model.set("hitType", hit_type);
        model
    }

    pub fn hit_type(&self) -> Option<&str> {
        self.get_str("hitType")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Transport hint (e.g. "beacon"), if the sender gave one
    pub fn transport(&self) -> Option<&str> {
        self.get_str("transport")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn merge(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

/// Field names filled by positional arguments after a hit-type string
fn positional_fields(hit_type: &str) -> &'static [&'static str] {
    match hit_type {
        "pageview" => &["page"],
        "event" => &["eventCategory", "eventAction", "eventLabel", "eventValue"],
        "social" => &["socialNetwork", "socialAction", "socialTarget"],
        "timing" => &["timingCategory", "timingVar", "timingValue", "timingLabel"],
        "screenview" => &["screenName"],
        "exception" => &["exDescription"],
        _ => &[],
    }
}

/// Build a hit model from `send` arguments.
///
/// Positional arguments only apply to the string form. The first object after
/// the leading argument is merged as the fields object and ends processing.
/// A `null` argument keeps its positional slot without setting a field.
pub fn build_model(call: &SendCall) -> Result<HitModel, TrackerError> {
    let mut args = call.args().iter();
    let mut model = HitModel::default();

    let string_form = match args.next() {
        Some(Value::String(hit_type)) => {
            model.set("hitType", hit_type.as_str());
            true
        }
        Some(Value::Object(fields)) => {
            model.merge(fields);
            false
        }
        Some(other) => return Err(TrackerError::InvalidCommand(other.to_string())),
        None => return Err(TrackerError::InvalidCommand("no arguments".to_string())),
    };

    let hit_type = model
        .hit_type()
        .map(str::to_string)
        .ok_or(TrackerError::MissingHitType)?;

    let names: &[&str] = if string_form {
        positional_fields(&hit_type)
    } else {
        &[]
    };
    let mut positional = names.iter();

    for arg in args {
        match arg {
            Value::Object(fields) => {
                model.merge(fields);
                break;
            }
            Value::Null => {
                positional.next();
            }
            value => {
                if let Some(name) = positional.next() {
                    model.set(name, value.clone());
                }
            }
        }
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hit_type_from_string_form() {
        let call = SendCall::new("event").arg("Video").arg("play");
        assert_eq!(call.hit_type(), Some("event"));
        assert!(!call.is_pageview());
    }

    #[test]
    fn test_hit_type_from_object_form() {
        let call = SendCall::new(json!({"hitType": "pageview", "page": "/home"}));
        assert_eq!(call.hit_type(), Some("pageview"));
        assert!(call.is_pageview());
    }

    #[test]
    fn test_hit_type_missing_for_malformed_first_arg() {
        assert_eq!(SendCall::new(42).hit_type(), None);
        assert_eq!(SendCall::from_args(vec![]).hit_type(), None);
        assert_eq!(SendCall::new(json!({"page": "/"})).hit_type(), None);
    }

    #[test]
    fn test_build_event_with_positional_args() {
        let call = SendCall::new("event")
            .arg("Video")
            .arg("play")
            .arg("intro")
            .arg(3);
        let model = build_model(&call).unwrap();

        assert_eq!(model.hit_type(), Some("event"));
        assert_eq!(model.get_str("eventCategory"), Some("Video"));
        assert_eq!(model.get_str("eventAction"), Some("play"));
        assert_eq!(model.get_str("eventLabel"), Some("intro"));
        assert_eq!(model.get("eventValue"), Some(&json!(3)));
    }

    #[test]
    fn test_build_merges_fields_object_and_stops() {
        let call = SendCall::new("pageview")
            .arg("/pricing")
            .arg(json!({"title": "Pricing", "transport": "beacon"}))
            .arg(json!({"ignored": true}));
        let model = build_model(&call).unwrap();

        assert_eq!(model.get_str("page"), Some("/pricing"));
        assert_eq!(model.get_str("title"), Some("Pricing"));
        assert_eq!(model.transport(), Some("beacon"));
        assert!(model.get("ignored").is_none());
    }

    #[test]
    fn test_build_null_keeps_positional_slot() {
        let call = SendCall::from_args(vec![
            json!("event"),
            json!("Nav"),
            Value::Null,
            json!("footer"),
        ]);
        let model = build_model(&call).unwrap();

        assert_eq!(model.get_str("eventCategory"), Some("Nav"));
        assert!(model.get("eventAction").is_none());
        assert_eq!(model.get_str("eventLabel"), Some("footer"));
    }

    #[test]
    fn test_build_object_form_ignores_positional_args() {
        let call = SendCall::new(json!({"hitType": "event", "eventCategory": "A"})).arg("B");
        let model = build_model(&call).unwrap();

        assert_eq!(model.get_str("eventCategory"), Some("A"));
        assert!(model.get("eventAction").is_none());
    }

    #[test]
    fn test_build_rejects_malformed_commands() {
        assert!(matches!(
            build_model(&SendCall::new(7)),
            Err(TrackerError::InvalidCommand(_))
        ));
        assert!(matches!(
            build_model(&SendCall::from_args(vec![])),
            Err(TrackerError::InvalidCommand(_))
        ));
        assert_eq!(
            build_model(&SendCall::new(json!({"page": "/"}))),
            Err(TrackerError::MissingHitType)
        );
    }

    #[test]
    fn test_unknown_hit_type_takes_only_fields_object() {
        let call = SendCall::new("item").arg("sku-1").arg(json!({"price": 9}));
        let model = build_model(&call).unwrap();

        assert_eq!(model.hit_type(), Some("item"));
        assert_eq!(model.get("price"), Some(&json!(9)));
        assert_eq!(model.fields().len(), 2);
    }
}
