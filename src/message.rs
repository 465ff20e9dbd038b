//! Message payloads flowing through a pipeline.
//!
//! A [`Message`] is an opaque JSON body with an optional simulation epoch.
//! The engine imposes no schema on the body; the epoch is required only for
//! payloads that cross time-gated branches ([`crate::control::window`]) or
//! priority queues ([`crate::control::queue`]).

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stage::StageError;

/// The J2000 reference epoch (2000-01-01T12:00:00Z), the fixed zero point
/// for epoch-priority ordering.
#[must_use]
pub fn j2000() -> DateTime<Utc> {
    DateTime::from_timestamp(946_728_000, 0).expect("J2000 is a valid timestamp")
}

/// A payload travelling between stages.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use serde_json::json;
/// use stageflow::message::Message;
///
/// let plain = Message::new(json!({"telemetry": [1, 2, 3]}));
/// assert!(plain.epoch.is_none());
///
/// let stamped = Message::at(Utc::now(), json!("burn start"));
/// assert!(stamped.epoch.is_some());
/// ```
///
/// # Serialization
///
/// Messages serialize to JSON for transport layers built on top of the
/// engine:
///
/// ```
/// use serde_json::json;
/// use stageflow::message::Message;
///
/// let msg = Message::new(json!(42));
/// let round_trip: Message =
///     serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
/// assert_eq!(msg, round_trip);
/// ```
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Simulation timestamp, if the payload carries one.
    pub epoch: Option<DateTime<Utc>>,
    /// Opaque payload body.
    pub body: Value,
}

impl Message {
    /// Creates a message without an epoch.
    #[must_use]
    pub fn new(body: Value) -> Self {
        Self { epoch: None, body }
    }

    /// Creates a message stamped with a simulation epoch.
    #[must_use]
    pub fn at(epoch: DateTime<Utc>, body: Value) -> Self {
        Self {
            epoch: Some(epoch),
            body,
        }
    }

    /// The epoch, or a [`StageError::MissingEpoch`] for time-gated stages.
    pub fn require_epoch(&self) -> Result<DateTime<Utc>, StageError> {
        self.epoch.ok_or(StageError::MissingEpoch)
    }

    /// Priority key for epoch ordering: milliseconds since [`j2000`].
    ///
    /// Lower keys are processed first by the priority queue.
    #[must_use]
    pub fn priority_key(&self) -> Option<i64> {
        self.epoch
            .map(|epoch| (epoch - j2000()).num_milliseconds())
    }

    /// Seconds offset of this message's epoch from a reference point.
    #[must_use]
    pub fn offset_from(&self, reference: DateTime<Utc>) -> Option<TimeDelta> {
        self.epoch.map(|epoch| epoch - reference)
    }

    /// Combines a completed fan-in round into a single downstream message.
    ///
    /// The body is the JSON array of the constituent bodies in the order
    /// given (upstream-registration order at the merge); a constituent that
    /// produced no result contributes `null`. The epoch is the latest epoch
    /// present among the constituents.
    #[must_use]
    pub fn merged(parts: Vec<Option<Message>>) -> Self {
        let epoch = parts
            .iter()
            .filter_map(|part| part.as_ref().and_then(|m| m.epoch))
            .max();
        let body = Value::Array(
            parts
                .into_iter()
                .map(|part| part.map(|m| m.body).unwrap_or(Value::Null))
                .collect(),
        );
        Self { epoch, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn epoch(secs_past_j2000: i64) -> DateTime<Utc> {
        j2000() + TimeDelta::seconds(secs_past_j2000)
    }

    #[test]
    fn priority_key_counts_from_j2000() {
        let msg = Message::at(epoch(90), json!(null));
        assert_eq!(msg.priority_key(), Some(90_000));
        assert_eq!(Message::new(json!(null)).priority_key(), None);
    }

    #[test]
    fn require_epoch_rejects_unstamped_payloads() {
        let msg = Message::new(json!("no clock"));
        assert!(matches!(
            msg.require_epoch(),
            Err(StageError::MissingEpoch)
        ));
    }

    #[test]
    fn merged_preserves_order_and_latest_epoch() {
        let merged = Message::merged(vec![
            Some(Message::at(epoch(10), json!("a"))),
            None,
            Some(Message::at(epoch(30), json!("c"))),
        ]);
        assert_eq!(merged.body, json!(["a", null, "c"]));
        assert_eq!(merged.epoch, Some(epoch(30)));
    }

    #[test]
    fn merged_without_epochs_has_none() {
        let merged = Message::merged(vec![Some(Message::new(json!(1))), None]);
        assert_eq!(merged.epoch, None);
        assert_eq!(merged.body, json!([1, null]));
    }
}
