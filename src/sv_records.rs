//! Log record model
//!
//! One `Record` per log line. The payload stays as raw JSON bytes until
//! ingestion decodes it against the declared `MessageKind`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::sv_error::DecodeError;
use crate::sv_interface::{NodeId, SvTime};

// message names as written by the simulator
const MESSAGE_CURRENT_POSITION: &str = "current position";
const MESSAGE_LINKS: &str = "links";
const MESSAGE_ROUTING_1D_REQUIRED: &str = "routing 1d required";
const MESSAGE_ROUTING_2D_REQUIRED: &str = "routing 2d required";
const MESSAGE_LINK_STATUS: &str = "link status";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    CurrentPosition,
    Links,
    Routing1DRequired,
    Routing2DRequired,
    LinkStatus,
    /// Anything the viewer does not interpret. Skipped by ingestion.
    Other(String),
}

impl MessageKind {
    pub fn from_wire(name: &str) -> Self {
        match name {
            MESSAGE_CURRENT_POSITION => MessageKind::CurrentPosition,
            MESSAGE_LINKS => MessageKind::Links,
            MESSAGE_ROUTING_1D_REQUIRED => MessageKind::Routing1DRequired,
            MESSAGE_ROUTING_2D_REQUIRED => MessageKind::Routing2DRequired,
            MESSAGE_LINK_STATUS => MessageKind::LinkStatus,
            other => MessageKind::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            MessageKind::CurrentPosition => MESSAGE_CURRENT_POSITION,
            MessageKind::Links => MESSAGE_LINKS,
            MessageKind::Routing1DRequired => MESSAGE_ROUTING_1D_REQUIRED,
            MessageKind::Routing2DRequired => MESSAGE_ROUTING_2D_REQUIRED,
            MessageKind::LinkStatus => MESSAGE_LINK_STATUS,
            MessageKind::Other(name) => name,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

// ============================================================================
// Status enumerations
// ============================================================================

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LinkStatus {
    #[default]
    Offline = 0,
    Connecting = 1,
    Online = 2,
    Closing = 3,
}

impl TryFrom<i64> for LinkStatus {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LinkStatus::Offline),
            1 => Ok(LinkStatus::Connecting),
            2 => Ok(LinkStatus::Online),
            3 => Ok(LinkStatus::Closing),
            other => Err(other),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthStatus {
    #[default]
    None = 0,
    Success = 1,
    Failure = 2,
}

impl TryFrom<i64> for AuthStatus {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AuthStatus::None),
            1 => Ok(AuthStatus::Success),
            2 => Ok(AuthStatus::Failure),
            other => Err(other),
        }
    }
}

// ============================================================================
// Wire parameters
// ============================================================================

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

/// `current position`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentPositionParam {
    pub coordinate: Coordinate,
}

/// `links` and `routing 1d required`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NidsParam {
    pub nids: Vec<NodeId>,
}

/// `routing 2d required`; the coordinates are validated but never drawn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Routing2DParam {
    pub nids: BTreeMap<NodeId, Coordinate>,
}

/// `link status`; statuses travel as plain integers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkStatusParam {
    pub seed: i64,
    pub node: i64,
    pub auth: i64,
    pub onlyone: bool,
}

/// Decoded, typed payload of a record
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    CurrentPosition {
        x: f64,
        y: f64,
    },
    Links(Vec<NodeId>),
    Routing1DRequired(Vec<NodeId>),
    /// Key set of the routing map
    Routing2DRequired(Vec<NodeId>),
    LinkStatus {
        seed: LinkStatus,
        node: LinkStatus,
        auth: AuthStatus,
        only_one: bool,
    },
    Ignored,
}

// ============================================================================
// Record
// ============================================================================

/// One immutable log entry
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub node_id: NodeId,
    pub message: MessageKind,
    pub timestamp: SvTime,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(
        node_id: impl Into<NodeId>,
        message: MessageKind,
        timestamp: SvTime,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            message,
            timestamp,
            payload,
        }
    }

    /// Build a record by serializing `param` as its payload
    pub fn with_param<T: Serialize>(
        node_id: impl Into<NodeId>,
        message: MessageKind,
        timestamp: SvTime,
        param: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(
            node_id,
            message,
            timestamp,
            serde_json::to_vec(param)?,
        ))
    }

    /// Decode the payload for the declared message kind
    pub fn decode(&self) -> Result<Payload, DecodeError> {
        let payload = match &self.message {
            MessageKind::CurrentPosition => {
                let p: CurrentPositionParam = self.param()?;
                Payload::CurrentPosition {
                    x: p.coordinate.x,
                    y: p.coordinate.y,
                }
            }
            MessageKind::Links => Payload::Links(self.param::<NidsParam>()?.nids),
            MessageKind::Routing1DRequired => {
                Payload::Routing1DRequired(self.param::<NidsParam>()?.nids)
            }
            MessageKind::Routing2DRequired => {
                let p: Routing2DParam = self.param()?;
                Payload::Routing2DRequired(p.nids.into_keys().collect())
            }
            MessageKind::LinkStatus => {
                let p: LinkStatusParam = self.param()?;
                Payload::LinkStatus {
                    seed: self.status("seed", p.seed)?,
                    node: self.status("node", p.node)?,
                    auth: self.status("auth", p.auth)?,
                    only_one: p.onlyone,
                }
            }
            MessageKind::Other(_) => Payload::Ignored,
        };
        Ok(payload)
    }

    fn param<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_slice(&self.payload).map_err(|source| DecodeError::Payload {
            node_id: self.node_id.clone(),
            kind: self.message.clone(),
            source,
        })
    }

    fn status<S: TryFrom<i64, Error = i64>>(
        &self,
        field: &'static str,
        value: i64,
    ) -> Result<S, DecodeError> {
        S::try_from(value).map_err(|value| DecodeError::Status {
            node_id: self.node_id.clone(),
            field,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(sec: u32) -> SvTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, sec)
            .unwrap()
    }

    fn raw(message: &str, param: serde_json::Value) -> Record {
        Record::new(
            "n1",
            MessageKind::from_wire(message),
            at(0),
            serde_json::to_vec(&param).unwrap(),
        )
    }

    #[test]
    fn test_message_kind_wire_names() {
        for kind in [
            MessageKind::CurrentPosition,
            MessageKind::Links,
            MessageKind::Routing1DRequired,
            MessageKind::Routing2DRequired,
            MessageKind::LinkStatus,
        ] {
            assert_eq!(MessageKind::from_wire(kind.as_wire()), kind);
        }
        assert_eq!(
            MessageKind::from_wire("hello"),
            MessageKind::Other("hello".to_string())
        );
    }

    #[test]
    fn test_decode_current_position() {
        let record = raw(
            "current position",
            json!({"coordinate": {"x": 1.5, "y": -0.25}}),
        );
        assert_eq!(
            record.decode().unwrap(),
            Payload::CurrentPosition { x: 1.5, y: -0.25 }
        );
    }

    #[test]
    fn test_decode_routing_2d_keeps_key_set() {
        let record = raw(
            "routing 2d required",
            json!({"nids": {"b": {"x": 0.0, "y": 1.0}, "a": {"x": 2.0, "y": 3.0}}}),
        );
        assert_eq!(
            record.decode().unwrap(),
            Payload::Routing2DRequired(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_decode_routing_2d_rejects_bad_coordinates() {
        let record = raw("routing 2d required", json!({"nids": {"a": {"x": "far"}}}));
        assert!(matches!(
            record.decode(),
            Err(DecodeError::Payload { kind: MessageKind::Routing2DRequired, .. })
        ));
    }

    #[test]
    fn test_decode_link_status() {
        let record = raw(
            "link status",
            json!({"seed": 2, "node": 1, "auth": 1, "onlyone": true}),
        );
        assert_eq!(
            record.decode().unwrap(),
            Payload::LinkStatus {
                seed: LinkStatus::Online,
                node: LinkStatus::Connecting,
                auth: AuthStatus::Success,
                only_one: true,
            }
        );
    }

    #[test]
    fn test_decode_link_status_out_of_range() {
        let record = raw(
            "link status",
            json!({"seed": 0, "node": 7, "auth": 0, "onlyone": false}),
        );
        match record.decode() {
            Err(DecodeError::Status { field, value, .. }) => {
                assert_eq!(field, "node");
                assert_eq!(value, 7);
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_links_type_mismatch() {
        let record = raw("links", json!({"nids": "not-a-list"}));
        assert!(record.decode().is_err());
    }

    #[test]
    fn test_unknown_message_is_ignored() {
        let record = raw("something else", json!({"whatever": 1}));
        assert_eq!(record.decode().unwrap(), Payload::Ignored);
    }
}
