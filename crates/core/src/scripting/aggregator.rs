//! Batches script output lines and flushes them to durable storage.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::StoreError;
use super::store::ScriptStore;
use crate::types::DbId;

/// Destination for flushed output batches.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn flush(&self, text: &str) -> Result<(), StoreError>;
}

/// Sink that appends batches to a script record's output.
pub struct StoreSink {
    store: Arc<dyn ScriptStore>,
    id: DbId,
}

impl StoreSink {
    pub fn new(store: Arc<dyn ScriptStore>, id: DbId) -> Self {
        Self { store, id }
    }
}

#[async_trait]
impl OutputSink for StoreSink {
    async fn flush(&self, text: &str) -> Result<(), StoreError> {
        self.store.append_output(self.id, text).await.map(|_| ())
    }
}

/// Counters describing a completed drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub lines: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Consumes an output sequence in batches of `batch_size` lines.
#[derive(Debug, Clone, Copy)]
pub struct OutputAggregator {
    batch_size: usize,
}

impl OutputAggregator {
    /// A `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Drain `lines` until the sender side closes.
    ///
    /// Each line is written followed by `\n`. A full buffer is flushed as
    /// one batch; whatever remains at the end is flushed once more. Flush
    /// failures are logged and counted, never returned.
    pub async fn drain(
        &self,
        mut lines: mpsc::UnboundedReceiver<String>,
        sink: &dyn OutputSink,
    ) -> DrainSummary {
        let mut summary = DrainSummary::default();
        let mut buffer = String::new();
        let mut buffered = 0;

        while let Some(line) = lines.recv().await {
            buffer.push_str(&line);
            buffer.push('\n');
            buffered += 1;
            summary.lines += 1;

            if buffered >= self.batch_size {
                flush_batch(sink, &buffer, &mut summary).await;
                buffer.clear();
                buffered = 0;
            }
        }

        if buffered > 0 {
            flush_batch(sink, &buffer, &mut summary).await;
        }

        summary
    }
}

async fn flush_batch(sink: &dyn OutputSink, text: &str, summary: &mut DrainSummary) {
    summary.batches += 1;
    if let Err(e) = sink.flush(text).await {
        summary.failed_batches += 1;
        tracing::warn!(
            error = %e,
            bytes = text.len(),
            "Failed to flush script output batch; batch dropped"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
