//! JSON message contract of the occupancy channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inbound push message describing a join or leave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyMessage {
    /// Slot (workstation host) the message refers to.
    pub host: String,
    /// Handle of the person joining or leaving.
    pub login: String,
    /// Portrait address of the person.
    #[serde(default)]
    pub image: String,
    /// Whether the person left the slot.
    #[serde(default)]
    pub left: bool,
}

/// Outbound subscription handshake naming the scope to mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Numeric cluster identifier; zero is ignored by the server.
    pub cluster: u32,
}

impl Subscription {
    /// Encodes the handshake as a JSON text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Errors raised while decoding inbound frames.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame was not a valid occupancy message.
    #[error("malformed occupancy message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes a text frame into an occupancy message.
pub fn decode(text: &str) -> Result<OccupancyMessage, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_join_frame() {
        let message = decode(
            r#"{"host":"e1r1p1","login":"alice","image":"https://cdn.example/a.jpg","left":false}"#,
        )
        .expect("valid frame");
        assert_eq!(message.host, "e1r1p1");
        assert!(!message.left);
    }

    #[test]
    fn missing_optional_fields_default() {
        let message = decode(r#"{"host":"e1r1p1","login":"alice"}"#).expect("valid frame");
        assert!(message.image.is_empty());
        assert!(!message.left);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn subscription_encodes_cluster_field() {
        let encoded = Subscription { cluster: 199 }.encode().expect("encodes");
        assert_eq!(encoded, r#"{"cluster":199}"#);
    }
}
