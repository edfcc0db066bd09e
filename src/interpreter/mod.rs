//! Content interpreters
//!
//! An interpreter turns the body of a successful response into a status and a
//! structured payload. Malformed-but-expected content must still produce a
//! verdict; an `Err` is treated as an unclassified failure and stops the
//! shard.

mod phone;

pub use phone::PhoneInterpreter;

use crate::record::{FetchStatus, Payload};

/// Verdict of an interpreter over one document
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub status: FetchStatus,
    pub payload: Payload,
}

impl Interpretation {
    pub fn new(status: impl Into<FetchStatus>, payload: Payload) -> Self {
        Self {
            status: status.into(),
            payload,
        }
    }

    /// An `OK` verdict carrying the given payload
    pub fn ok(payload: Payload) -> Self {
        Self::new(FetchStatus::Ok, payload)
    }
}

/// Pluggable capability turning fetched bytes into an `Interpretation`
pub trait ContentInterpreter: Send + Sync {
    fn process(&self, content: &[u8]) -> anyhow::Result<Interpretation>;
}

impl<F> ContentInterpreter for F
where
    F: Fn(&[u8]) -> anyhow::Result<Interpretation> + Send + Sync,
{
    fn process(&self, content: &[u8]) -> anyhow::Result<Interpretation> {
        self(content)
    }
}
