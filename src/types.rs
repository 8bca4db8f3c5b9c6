//! Core types for the notification center.

use crate::error::{NotificationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identity of whoever posted a notification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub u64);

impl SenderId {
    /// Identity from a caller-chosen number.
    pub fn new(id: u64) -> Self {
        SenderId(id)
    }

    /// Identity derived from the address of `value`.
    ///
    /// Only stable while `value` stays at the same address, so use it on
    /// heap-pinned values (`Arc`, `Box`) or statics.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        SenderId(value as *const T as *const () as usize as u64)
    }
}

impl fmt::Debug for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SenderId({:#x})", self.0)
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Unique identifier for a subscription within one center.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single value in a notification payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<PayloadValue>),
    Map(BTreeMap<String, PayloadValue>),
}

impl PayloadValue {
    /// Text value, if this is `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if this is `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PayloadValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value; `Int` widens to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PayloadValue::Float(n) => Some(*n),
            PayloadValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Boolean value, if this is `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PayloadValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to JSON. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            PayloadValue::Null => Value::Null,
            PayloadValue::Bool(b) => Value::Bool(*b),
            PayloadValue::Int(n) => Value::from(*n),
            PayloadValue::Float(n) => Value::from(*n),
            PayloadValue::Text(s) => Value::String(s.clone()),
            PayloadValue::Bytes(bytes) => {
                Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
            }
            PayloadValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PayloadValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Convert from JSON. Numbers that fit in `i64` become `Int`.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => PayloadValue::Null,
            Value::Bool(b) => PayloadValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PayloadValue::Int(i),
                None => PayloadValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => PayloadValue::Text(s),
            Value::Array(items) => {
                PayloadValue::List(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => PayloadValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for PayloadValue {
    fn from(b: bool) -> Self {
        PayloadValue::Bool(b)
    }
}

impl From<i64> for PayloadValue {
    fn from(n: i64) -> Self {
        PayloadValue::Int(n)
    }
}

impl From<i32> for PayloadValue {
    fn from(n: i32) -> Self {
        PayloadValue::Int(n.into())
    }
}

impl From<f64> for PayloadValue {
    fn from(n: f64) -> Self {
        PayloadValue::Float(n)
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::Text(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::Text(s)
    }
}

impl From<Vec<u8>> for PayloadValue {
    fn from(bytes: Vec<u8>) -> Self {
        PayloadValue::Bytes(bytes)
    }
}

/// Key/value bag carried by a notification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload(BTreeMap<String, PayloadValue>);

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PayloadValue>,
    ) -> Option<PayloadValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    /// Get a text value by key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PayloadValue::as_str)
    }

    /// Get an integer value by key.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PayloadValue::as_i64)
    }

    /// Get a boolean value by key.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(PayloadValue::as_bool)
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PayloadValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert to a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Build a payload from a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Payload(
                map.into_iter()
                    .map(|(k, v)| (k, PayloadValue::from_json(v)))
                    .collect(),
            )),
            other => Err(NotificationError::InvalidArgument(format!(
                "payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl<K, V> FromIterator<(K, V)> for Payload
where
    K: Into<String>,
    V: Into<PayloadValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Payload(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A named event broadcast to interested observers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    name: String,
    sender: Option<SenderId>,
    payload: Option<Payload>,
}

impl Notification {
    /// Create a notification. Fails on an empty name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(NotificationError::empty_name());
        }
        Ok(Self {
            name,
            sender: None,
            payload: None,
        })
    }

    /// Attach the sender identity.
    pub fn with_sender(mut self, sender: SenderId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Notification name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Who posted it, if known.
    pub fn sender(&self) -> Option<SenderId> {
        self.sender
    }

    /// Attached payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sender {
            Some(sender) => write!(f, "{} from {}", self.name, sender),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_rejects_empty_name() {
        let result = Notification::new("");
        assert!(matches!(result, Err(NotificationError::InvalidArgument(_))));
    }

    #[test]
    fn test_notification_equality_is_by_value() {
        let a = Notification::new("login")
            .unwrap()
            .with_sender(SenderId(7))
            .with_payload(Payload::new().with("user", "ada"));
        let b = Notification::new("login")
            .unwrap()
            .with_sender(SenderId(7))
            .with_payload(Payload::new().with("user", "ada"));
        assert_eq!(a, b);

        let c = a.clone().with_sender(SenderId(8));
        assert_ne!(a, c);
    }

    #[test]
    fn test_sender_of_uses_address() {
        let a = Box::new(1u8);
        let b = Box::new(1u8);
        assert_eq!(SenderId::of(&*a), SenderId::of(&*a));
        assert_ne!(SenderId::of(&*a), SenderId::of(&*b));
    }

    #[test]
    fn test_payload_accessors() {
        let payload: Payload = [("retries", PayloadValue::Int(3)), ("ok", true.into())]
            .into_iter()
            .collect();

        assert_eq!(payload.get_i64("retries"), Some(3));
        assert_eq!(payload.get_bool("ok"), Some(true));
        assert_eq!(payload.get_str("retries"), None);
        assert!(payload.get("missing").is_none());
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_payload_from_json() {
        let payload = Payload::from_json(json!({
            "host": "127.0.0.1",
            "port": 9000,
            "ratio": 0.5,
            "tags": ["a", "b"],
        }))
        .unwrap();

        assert_eq!(payload.get_str("host"), Some("127.0.0.1"));
        assert_eq!(payload.get_i64("port"), Some(9000));
        assert_eq!(payload.get("ratio").and_then(PayloadValue::as_f64), Some(0.5));
        assert_eq!(
            payload.get("tags"),
            Some(&PayloadValue::List(vec!["a".into(), "b".into()]))
        );
        assert_eq!(payload.to_json()["port"], json!(9000));
    }

    #[test]
    fn test_payload_from_non_object_json() {
        let result = Payload::from_json(json!([1, 2, 3]));
        assert!(matches!(result, Err(NotificationError::InvalidArgument(_))));
    }

    #[test]
    fn test_bytes_to_json() {
        let value = PayloadValue::Bytes(vec![1, 2]);
        assert_eq!(value.to_json(), json!([1, 2]));
    }
}
