use crate::record::FetchRecord;
use crate::sink::{ResultSink, SinkError};
use std::io::{self, Stdout, Write};
use std::sync::Mutex;

/// Writes each record as one JSON line and flushes immediately
///
/// Flushing per record means a shard that dies right after recording an
/// unknown failure has already delivered that record.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<Option<W>>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Closes the sink and hands back the writer
    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl JsonLinesSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ResultSink for JsonLinesSink<W> {
    fn put(&self, record: FetchRecord) -> Result<(), SinkError> {
        let line = serde_json::to_string(&record)?;
        let mut guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let writer = guard.as_mut().ok_or(SinkError::Closed)?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        let mut guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut writer) = guard.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
