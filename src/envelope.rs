//! # The wire format jobs travel in.
//!
//! An [`Envelope`] is the unit written to the store:
//!
//! ```text
//! {"N":"<name>","A":{"<field>":<value>,...},"T":<unix-ms>}
//! ```
//!
//! `N` is the handler name used for dispatch, `A` is the handler's field
//! document, and `T` is the optional scheduled instant in milliseconds since
//! the epoch (absent for immediate jobs). The document is self-describing
//! JSON so producers and consumers only need to agree on handler names and
//! field names, not on a compiled-in schema version.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::QueueError;
use crate::job::Job;

/// Serialized form of one enqueued job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Handler name, resolved against the consumer's registry.
    #[serde(rename = "N")]
    pub name: String,

    /// Handler fields by name.
    #[serde(rename = "A", default)]
    pub args: Map<String, Value>,

    /// Scheduled execution instant in unix milliseconds; `None` means
    /// the job is due immediately.
    #[serde(rename = "T", default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<i64>,
}

/// Serializes a job into envelope JSON, ready to push to the store.
pub(crate) fn encode<J: Job + Serialize>(job: &J, run_at: Option<i64>) -> Result<String, QueueError> {
    let name = job.name().to_string();
    if name.is_empty() {
        return Err(QueueError::bad_config("job name must not be empty"));
    }

    let envelope = Envelope {
        args: arguments(job)?,
        run_at,
        name,
    };
    serde_json::to_string(&envelope).map_err(QueueError::malformed)
}

/// Extracts a job's field document.
///
/// Handlers must serialize to a JSON object; anything else (a bare number,
/// a tuple, a unit value) has no field names to dispatch on and is rejected
/// before any store interaction.
pub(crate) fn arguments<J: Job + Serialize>(job: &J) -> Result<Map<String, Value>, QueueError> {
    match serde_json::to_value(job) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(QueueError::InvalidArguments {
            name: job.name().to_string(),
        }),
        Err(error) => Err(QueueError::malformed(error)),
    }
}

/// Reconciles an incoming value with the field slot it is about to fill.
///
/// Producers in other runtimes encode every number as a double, so an
/// integer field may arrive as `4.0`. When the slot holds an integer and the
/// incoming number is a whole-valued float, it is narrowed back to an
/// integer; everything else passes through untouched and is judged by the
/// handler's own `Deserialize` impl.
pub(crate) fn widen(value: &Value, slot: &Value) -> Value {
    if let (Value::Number(incoming), Value::Number(current)) = (value, slot) {
        if !current.is_f64() && incoming.is_f64() {
            if let Some(float) = incoming.as_f64() {
                if float.fract() == 0.0 {
                    if float >= 0.0 && float <= u64::MAX as f64 {
                        return Value::from(float as u64);
                    }
                    if float >= i64::MIN as f64 && float < 0.0 {
                        return Value::from(float as i64);
                    }
                }
            }
        }
    }
    value.clone()
}

/// Milliseconds since the unix epoch; instants before it saturate to 0.
pub(crate) fn unix_millis(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(_) => 0,
    }
}
