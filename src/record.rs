//! Result records emitted once per attempted URL
//!
//! On the wire a record is a single flat JSON object: the `url` and `status`
//! keys followed by whatever keys the content interpreter put in its payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured data extracted from a document by a content interpreter
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Keys owned by the record itself; interpreters may not override them
const RESERVED_KEYS: [&str; 2] = ["url", "status"];

/// Outcome of fetching a single URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FetchStatus {
    /// The interpreter accepted the document
    Ok,

    /// The server answered with a status outside [200, 300)
    Http(u16),

    /// Timeout, refused or reset connection, disconnect mid-read, proxy failure
    Network,

    /// Anything else; the shard that produced it stops right after recording it
    Unknown,

    /// A non-OK status string chosen by the interpreter
    Other(String),
}

impl FetchStatus {
    /// Returns true if this is the interpreter's OK status
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Http(code) => write!(f, "ERROR:HTTP{}", code),
            Self::Network => write!(f, "ERROR:NETWORK"),
            Self::Unknown => write!(f, "ERROR:UNKNOWN"),
            Self::Other(status) => write!(f, "{}", status),
        }
    }
}

impl From<FetchStatus> for String {
    fn from(status: FetchStatus) -> Self {
        status.to_string()
    }
}

impl From<String> for FetchStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "OK" => Self::Ok,
            "ERROR:NETWORK" => Self::Network,
            "ERROR:UNKNOWN" => Self::Unknown,
            _ => match s.strip_prefix("ERROR:HTTP").and_then(|c| c.parse().ok()) {
                Some(code) => Self::Http(code),
                None => Self::Other(s),
            },
        }
    }
}

impl From<&str> for FetchStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

/// One result per attempted URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRecord {
    pub url: String,
    pub status: FetchStatus,
    #[serde(flatten)]
    pub payload: Payload,
}

impl FetchRecord {
    /// Builds a record from an interpreter's verdict
    ///
    /// Payload entries named `url` or `status` are dropped.
    pub fn interpreted(url: impl Into<String>, status: FetchStatus, mut payload: Payload) -> Self {
        let url = url.into();
        for key in RESERVED_KEYS {
            if payload.remove(key).is_some() {
                tracing::warn!("Dropping reserved payload key '{}' for {}", key, url);
            }
        }
        Self {
            url,
            status,
            payload,
        }
    }

    /// Builds an error record, which never carries a payload
    pub fn error(url: impl Into<String>, status: FetchStatus) -> Self {
        Self {
            url: url.into(),
            status,
            payload: Payload::new(),
        }
    }

    /// Returns the payload, or None when the record has none
    pub fn payload(&self) -> Option<&Payload> {
        if self.payload.is_empty() {
            None
        } else {
            Some(&self.payload)
        }
    }
}
