//! Result sinks
//!
//! A sink receives exactly one record per attempted URL. Inside a shard
//! process the sink is the JSON-lines writer on stdout, which the supervisor
//! reads; tests and in-process runs use the memory sink.

mod json_lines;
mod memory;

pub use json_lines::JsonLinesSink;
pub use memory::MemorySink;

use crate::record::FetchRecord;
use thiserror::Error;

/// Errors that can occur while handing records to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Sink is closed")]
    Closed,
}

/// Destination for result records
///
/// Implementations must be safe to share between the worker units of a shard.
pub trait ResultSink: Send + Sync {
    /// Accepts one record
    fn put(&self, record: FetchRecord) -> Result<(), SinkError>;

    /// Flushes buffered records; calling it more than once is harmless
    fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<T: ResultSink + ?Sized> ResultSink for std::sync::Arc<T> {
    fn put(&self, record: FetchRecord) -> Result<(), SinkError> {
        (**self).put(record)
    }

    fn close(&self) -> Result<(), SinkError> {
        (**self).close()
    }
}
