//! # Handler registry: the dispatch table from envelope names to code.
//!
//! Each [`register`](JobRegistry::register) call captures two things from a
//! by-value prototype: the prototype's serialized field document, and a typed
//! decode closure that turns an envelope's `A` object back into a fresh owned
//! handler. Decoding overlays the envelope onto the prototype document, so
//! unknown keys are ignored and missing keys keep the prototype's values, and
//! no handler instance is ever shared between workers.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::{self, Envelope};
use crate::error::QueueError;
use crate::job::Job;

type DecodeFn = Box<dyn Fn(&Map<String, Value>) -> Result<Box<dyn Job>, QueueError> + Send + Sync>;

/// Maps handler names to decoders. Read-only once the pool starts.
#[derive(Default)]
pub struct JobRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl JobRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler prototype under its [`Job::name`].
    ///
    /// The prototype is consumed: its serialized fields become the defaults
    /// for any envelope key the producer left out. Usually the prototype is
    /// simply `MyJob::default()`.
    ///
    /// # Errors
    ///
    /// [`QueueError::BadConfig`] for an empty name,
    /// [`QueueError::DuplicateJob`] when the name is already taken, and
    /// [`QueueError::InvalidArguments`] when the prototype does not
    /// serialize to a JSON object.
    pub fn register<J>(&mut self, prototype: J) -> Result<(), QueueError>
    where
        J: Job + Serialize + DeserializeOwned,
    {
        let name = prototype.name().to_string();
        if name.is_empty() {
            return Err(QueueError::bad_config("job name must not be empty"));
        }
        if self.decoders.contains_key(&name) {
            return Err(QueueError::DuplicateJob { name });
        }

        let defaults = envelope::arguments(&prototype)?;
        self.decoders.insert(
            name,
            Box::new(move |args| {
                let mut doc = defaults.clone();
                for (key, value) in args {
                    // Keys the handler type never had are dropped here.
                    if let Some(slot) = doc.get_mut(key) {
                        *slot = envelope::widen(value, slot);
                    }
                }
                match serde_json::from_value::<J>(Value::Object(doc)) {
                    Ok(job) => Ok(Box::new(job) as Box<dyn Job>),
                    Err(error) => Err(QueueError::malformed(error)),
                }
            }),
        );
        Ok(())
    }

    /// Whether a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the registry has no handlers at all.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decodes raw store bytes into an owned, executable handler.
    pub(crate) fn decode(&self, payload: &str) -> Result<Box<dyn Job>, QueueError> {
        let envelope: Envelope = serde_json::from_str(payload).map_err(QueueError::malformed)?;
        if envelope.name.is_empty() {
            return Err(QueueError::malformed("envelope has an empty job name"));
        }

        let decoder = self
            .decoders
            .get(&envelope.name)
            .ok_or(QueueError::UnknownJob {
                name: envelope.name.clone(),
            })?;
        decoder(&envelope.args)
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("JobRegistry").field("jobs", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde::Deserialize;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::error::JobError;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Transcode {
        foo: i64,
        bar: String,
        loud: bool,
        gain: f64,
    }

    #[async_trait]
    impl Job for Transcode {
        fn name(&self) -> &str {
            "transcode"
        }

        async fn execute(&self, _cancel: CancellationToken) -> Result<(), JobError> {
            Ok(())
        }
    }

    fn registry() -> JobRegistry {
        let mut jobs = JobRegistry::new();
        jobs.register(Transcode::default())
            .expect("registration should succeed");
        jobs
    }

    #[test]
    fn round_trip_preserves_every_field_kind() {
        let original = Transcode {
            foo: 42,
            bar: "sup".into(),
            loud: true,
            gain: 1.25,
        };
        let payload = envelope::encode(&original, None).expect("encode should succeed");

        let decoded = registry().decode(&payload).expect("decode should succeed");
        assert_eq!(decoded.name(), "transcode");

        // run the payload through once more to compare the concrete fields
        let redecoded: Transcode =
            serde_json::from_value(serde_json::Value::Object(
                serde_json::from_str::<Envelope>(&payload).unwrap().args,
            ))
            .unwrap();
        assert_eq!(redecoded, original);
    }

    #[test]
    fn integer_fields_accept_double_encoded_numbers() {
        let payload = r#"{"N":"transcode","A":{"foo":4.0,"bar":"sup"}}"#;
        let job = registry().decode(payload).expect("whole floats widen into integers");
        assert_eq!(job.name(), "transcode");
    }

    #[test]
    fn fractional_numbers_do_not_fit_integer_fields() {
        let payload = r#"{"N":"transcode","A":{"foo":4.5}}"#;
        let err = match registry().decode(payload) {
            Err(e) => e,
            Ok(_) => panic!("4.5 is not an integer"),
        };
        assert!(matches!(err, QueueError::Malformed { .. }));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let payload = r#"{"N":"transcode","A":{"foo":7,"postscript":"later"}}"#;
        registry().decode(payload).expect("extra keys should be dropped");
    }

    #[test]
    fn missing_keys_keep_prototype_values() {
        let mut jobs = JobRegistry::new();
        jobs.register(Transcode {
            bar: "fallback".into(),
            ..Transcode::default()
        })
        .expect("registration should succeed");

        let payload = r#"{"N":"transcode","A":{"foo":7}}"#;
        jobs.decode(payload).expect("absent fields fall back to the prototype");
    }

    #[test]
    fn unknown_job_is_reported_by_name() {
        let err = match registry().decode(r#"{"N":"vacuum","A":{}}"#) {
            Err(e) => e,
            Ok(_) => panic!("nothing registered under 'vacuum'"),
        };
        assert!(matches!(err, QueueError::UnknownJob { name } if name == "vacuum"));
    }

    #[test]
    fn syntactically_broken_payloads_are_malformed() {
        let err = match registry().decode(r#"{"N":"transcode","A":"#) {
            Err(e) => e,
            Ok(_) => panic!("truncated JSON must not decode"),
        };
        assert!(matches!(err, QueueError::Malformed { .. }));
    }

    #[test]
    fn empty_envelope_name_is_malformed() {
        let err = match registry().decode(r#"{"N":"","A":{}}"#) {
            Err(e) => e,
            Ok(_) => panic!("empty names are not dispatchable"),
        };
        assert!(matches!(err, QueueError::Malformed { .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut jobs = registry();
        let err = jobs
            .register(Transcode::default())
            .expect_err("second registration of the same name must fail");
        assert!(matches!(err, QueueError::DuplicateJob { name } if name == "transcode"));
        assert_eq!(jobs.len(), 1);
    }
}
