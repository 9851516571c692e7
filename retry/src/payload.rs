use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

/// A successfully parsed backend response.
///
/// The backend always answers with a JSON object carrying a `status` string and
/// usually a `message`; everything else is operation specific and stays in
/// the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsePayload {
    status: String,
    body: Map<String, Value>,
}

impl ResponsePayload {
    pub(crate) fn new(status: String, body: Map<String, Value>) -> Self {
        Self { status, body }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// The conventional `data` field, when the backend sends one.
    pub fn data(&self) -> Option<&Value> {
        self.body.get("data")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Decode the whole body into a typed response.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.body.clone()))
    }

    pub fn into_body(self) -> Value {
        Value::Object(self.body)
    }
}
