//! The canonical inbound-call event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One inbound call notification.
///
/// `call_sid` is the provider-assigned identifier for a single call attempt
/// and is the correlation key across every producer and consumer: two events
/// carrying the same sid describe the same ring, not two rings.
///
/// The serialized field names (`fromNumber`, `callSid`, `timestampUtc`) are
/// the wire contract for the `incomingCall` push and must stay as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallArrivalEvent {
    /// E.164 number of the calling party
    #[serde(rename = "fromNumber")]
    pub from_number: String,
    /// Opaque provider call identifier, unique per call attempt
    #[serde(rename = "callSid")]
    pub call_sid: String,
    /// When the notification was accepted by the ingest path
    #[serde(rename = "timestampUtc")]
    pub timestamp_utc: DateTime<Utc>,
}

impl CallArrivalEvent {
    /// Create an event for a provider-originated call notification.
    pub fn new(from_number: impl Into<String>, call_sid: impl Into<String>) -> Self {
        Self {
            from_number: from_number.into(),
            call_sid: call_sid.into(),
            timestamp_utc: Utc::now(),
        }
    }

    /// Create an event for a test-harness request.
    ///
    /// The harness only supplies a caller number, so a fresh `test-<uuid>`
    /// sid is synthesized to keep the correlation key unique per attempt.
    pub fn test_call(from_number: impl Into<String>) -> Self {
        Self::new(from_number, format!("test-{}", Uuid::new_v4()))
    }

    /// Whether this event came from the test harness rather than the provider.
    pub fn is_test(&self) -> bool {
        self.call_sid.starts_with("test-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_stable() {
        let event = CallArrivalEvent::new("+353851234567", "CA123");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["fromNumber"], "+353851234567");
        assert_eq!(json["callSid"], "CA123");
        assert!(json.get("timestampUtc").is_some());
        // No snake_case leakage
        assert!(json.get("from_number").is_none());
    }

    #[test]
    fn test_call_synthesizes_unique_sids() {
        let a = CallArrivalEvent::test_call("+353861234567");
        let b = CallArrivalEvent::test_call("+353861234567");

        assert!(a.is_test());
        assert!(a.call_sid.starts_with("test-"));
        assert_ne!(a.call_sid, b.call_sid);
    }

    #[test]
    fn deserializes_provider_payload() {
        let json = r#"{
            "fromNumber": "+353851234567",
            "callSid": "CA9f3c",
            "timestampUtc": "2024-05-01T10:15:00Z"
        }"#;
        let event: CallArrivalEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.from_number, "+353851234567");
        assert_eq!(event.call_sid, "CA9f3c");
        assert!(!event.is_test());
    }
}
