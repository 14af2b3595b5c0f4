use thiserror::Error;

use crate::sv_interface::NodeId;
use crate::sv_records::MessageKind;

/// A record whose payload does not match its declared message kind
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("node {node_id}: malformed `{kind}` payload: {source}")]
    Payload {
        node_id: NodeId,
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("node {node_id}: {field} status {value} is out of range")]
    Status {
        node_id: NodeId,
        field: &'static str,
        value: i64,
    },
}

/// Errors that end a playback session
///
/// None of these are recoverable mid-tick: after a partial ingest the topology
/// is not consistent enough to group or draw.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("log source holds no records")]
    NoData,

    #[error("log source unavailable: {0}")]
    SourceUnavailable(#[from] std::io::Error),

    #[error("malformed log line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("render fault: {0}")]
    RenderFault(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for ViewError {
    fn from(e: serde_yaml::Error) -> Self {
        ViewError::Config(e.to_string())
    }
}
