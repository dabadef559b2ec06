//! JSON frames spoken on the `/hubs/calls` socket.

use serde::{Deserialize, Serialize};

use crate::event::CallArrivalEvent;

/// Messages a connected operator client may send to the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Add this connection to an ad-hoc fan-out group.
    #[serde(rename = "joinGroup")]
    JoinGroup { group: String },
}

/// Messages the hub pushes to connected operator clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// An inbound call has arrived. The event fields flatten into the frame,
    /// so the payload reads `{"type":"incomingCall","fromNumber":...}`.
    #[serde(rename = "incomingCall")]
    IncomingCall(CallArrivalEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_call_frame_shape() {
        let frame = ServerMessage::IncomingCall(CallArrivalEvent::new("+353851234567", "CA123"));
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "incomingCall");
        assert_eq!(json["fromNumber"], "+353851234567");
        assert_eq!(json["callSid"], "CA123");
    }

    #[test]
    fn join_group_round_trips() {
        let json = r#"{"type":"joinGroup","group":"operators"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinGroup {
                group: "operators".to_string()
            }
        );
    }
}
