//! Shared wire protocol for the whiteboard server and its clients.
//!
//! Every message on the socket is an [`Envelope`]: an event name plus a JSON
//! payload. Typed events ([`ClientEvent`], [`ServerEvent`]) are closed tagged
//! unions that convert to and from envelopes, so adding a message kind is a
//! compile-time-checked change on both ends.
//!
//! Envelopes travel as JSON text frames or as protobuf binary frames. The
//! binary form keeps the payload flexible (`google.protobuf.Value`) while
//! staying compact on the wire.

pub mod event;
pub mod room_code;

use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use event::*;
pub use room_code::{ROOM_CODE_LEN, RoomCode, RoomCodeError};

/// Error returned by the envelope and event codecs.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireEnvelope`.
    #[error("failed to decode protobuf envelope: {0}")]
    Decode(#[from] prost::DecodeError),
    /// Text frame was not a JSON envelope, or an event payload had the wrong shape.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// An event serialized to something other than a tagged object.
    #[error("event did not serialize to a tagged object")]
    Untagged,
}

/// Grepable error code and retryable flag for structured error replies.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique identifier for this message, used only for log correlation.
    #[serde(default)]
    pub id: String,
    /// Milliseconds since the Unix epoch when the message was created.
    #[serde(default)]
    pub ts: i64,
    /// Event name, e.g. `"add-canvas-object"`.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Build an envelope stamped with a fresh id and the current time.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { id: new_id(), ts: now_ms(), event: event.into(), data }
    }

    /// Wrap a typed event.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] if the event payload cannot be serialized.
    pub fn from_event<E: Serialize>(event: &E) -> Result<Self, CodecError> {
        let Value::Object(mut map) = serde_json::to_value(event)? else {
            return Err(CodecError::Untagged);
        };
        let Some(Value::String(name)) = map.remove(EVENT_TAG) else {
            return Err(CodecError::Untagged);
        };
        let data = map.remove(EVENT_CONTENT).unwrap_or(Value::Null);
        Ok(Self::new(name, data))
    }

    /// Interpret the envelope as a typed event.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Json`] for unknown event names or payloads that do
    /// not match the event's schema.
    pub fn to_event<E: DeserializeOwned>(&self) -> Result<E, CodecError> {
        let mut map = Map::new();
        map.insert(EVENT_TAG.into(), Value::String(self.event.clone()));
        if !self.data.is_null() {
            map.insert(EVENT_CONTENT.into(), self.data.clone());
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

/// Adjacent tag key used by the typed event enums.
const EVENT_TAG: &str = "event";
/// Adjacent content key used by the typed event enums.
const EVENT_CONTENT: &str = "data";

/// Encode an envelope as a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_json(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decode a JSON text frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text.
pub fn decode_json(text: &str) -> Result<Envelope, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode an envelope into protobuf bytes.
#[must_use]
pub fn encode_binary(envelope: &Envelope) -> Vec<u8> {
    let wire = WireEnvelope {
        id: envelope.id.clone(),
        ts: envelope.ts,
        event: envelope.event.clone(),
        data: Some(json_to_proto_value(&envelope.data)),
    };

    let mut out = Vec::with_capacity(wire.encoded_len());
    // Encoding into a growable Vec cannot hit `BufferTooSmall`.
    wire.encode(&mut out).unwrap_or_default();
    out
}

/// Decode protobuf bytes into an envelope.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes.
pub fn decode_binary(bytes: &[u8]) -> Result<Envelope, CodecError> {
    let wire = WireEnvelope::decode(bytes)?;
    Ok(Envelope {
        id: wire.id,
        ts: wire.ts,
        event: wire.event,
        data: wire
            .data
            .map_or(Value::Object(Map::new()), |v| proto_to_json_value(&v)),
    })
}

/// Fresh collision-resistant identifier.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => {
            prost_types::value::Kind::NullValue(prost_types::NullValue::NullValue as i32)
        }
        Value::Bool(v) => prost_types::value::Kind::BoolValue(*v),
        Value::Number(v) => prost_types::value::Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => prost_types::value::Kind::StringValue(v.clone()),
        Value::Array(v) => prost_types::value::Kind::ListValue(prost_types::ListValue {
            values: v.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(v) => prost_types::value::Kind::StructValue(prost_types::Struct {
            fields: v
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect(),
        }),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        prost_types::value::Kind::NullValue(_) => Value::Null,
        prost_types::value::Kind::NumberValue(v) => proto_number(*v),
        prost_types::value::Kind::StringValue(v) => Value::String(v.clone()),
        prost_types::value::Kind::BoolValue(v) => Value::Bool(*v),
        prost_types::value::Kind::StructValue(v) => Value::Object(
            v.fields
                .iter()
                .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
                .collect(),
        ),
        prost_types::value::Kind::ListValue(v) => {
            Value::Array(v.values.iter().map(proto_to_json_value).collect())
        }
    }
}

/// Protobuf only has doubles. Whole numbers inside the exactly-representable
/// range come back as JSON integers so timestamps still deserialize as `i64`.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn proto_number(v: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if v.fract() == 0.0 && v.abs() <= MAX_EXACT {
        return Value::Number(serde_json::Number::from(v as i64));
    }
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

#[derive(Clone, PartialEq, Message)]
struct WireEnvelope {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(int64, tag = "2")]
    ts: i64,
    #[prost(string, tag = "3")]
    event: String,
    #[prost(message, optional, tag = "4")]
    data: Option<prost_types::Value>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
