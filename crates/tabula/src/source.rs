//! Streaming result sources.
//!
//! A result-producing collaborator (a file index search, for example) runs on
//! a background thread and writes one result per line. [`ResultStream`] is
//! the consumer's end: a lazy iterator of lines, interruptible with
//! [`ResultStream::cancel`], whose typed outcome is only available once the
//! sequence has ended, from [`ResultStream::finish`].
//!
//! The stream never touches a model. Lines are turned into rows and applied
//! on the consuming thread by a [`RowBatcher`], one whole batch per model
//! notification.
//!
//! ```
//! use tabula::model::{ItemModel, TableModel};
//! use tabula::source::{ResultStream, split_path};
//!
//! let model = TableModel::new();
//! model.add_column(0usize, "Directory", false);
//! model.add_column(1usize, "Name", false);
//!
//! let stream = ResultStream::spawn(|sink| {
//!     for path in ["/usr/bin/env\n", "/etc/hosts\n"] {
//!         if !sink.send(path) {
//!             break;
//!         }
//!     }
//!     Ok(2)
//! })
//! .unwrap();
//!
//! let count = stream.populate(&model, 64, |line| split_path(&line)).unwrap();
//! assert_eq!(count, 2);
//! assert_eq!(model.row_count(), 2);
//! ```

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use tabula_core::CancellationToken;
use tabula_core::logging::targets;

use crate::config::SearchOptions;
use crate::error::SourceError;
use crate::model::{Row, RowRef, TableModel};

/// Lines buffered between producer and consumer.
const LINE_QUEUE_CAPACITY: usize = 1024;

/// The producer's end of a [`ResultStream`].
pub struct LineSink {
    sender: Sender<String>,
    cancel: CancellationToken,
    limit: Option<usize>,
    sent: usize,
}

impl LineSink {
    /// Delivers one line.
    ///
    /// Returns `false` once the producer should stop: the stream was
    /// cancelled, the result limit was reached, or the consumer is gone.
    pub fn send(&mut self, line: impl Into<String>) -> bool {
        if !self.accepts_more() {
            return false;
        }
        if self.sender.send(line.into()).is_err() {
            return false;
        }
        self.sent += 1;
        self.accepts_more()
    }

    /// Delivers one line of raw bytes, replacing invalid UTF-8.
    pub fn send_bytes(&mut self, line: &[u8]) -> bool {
        self.send(String::from_utf8_lossy(line))
    }

    /// Returns `true` while further lines would be delivered.
    pub fn accepts_more(&self) -> bool {
        !self.cancel.is_cancelled() && self.limit.is_none_or(|limit| self.sent < limit)
    }

    /// Returns the number of lines delivered so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Returns the stream's cancellation token.
    ///
    /// Producers that cannot poll register a hook with
    /// [`CancellationToken::on_cancel`] instead.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}

type ProducerOutcome = Result<i64, SourceError>;

/// A lazily consumed sequence of result lines from a background producer.
///
/// Iterating yields lines with their trailing newline removed. Dropping the
/// stream cancels the producer.
pub struct ResultStream {
    lines: Option<Receiver<String>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<ProducerOutcome>>,
    received: u64,
}

impl ResultStream {
    /// Starts `producer` on a background thread with no result limit.
    ///
    /// The producer returns its result count; a negative count reports a
    /// failure status.
    pub fn spawn<F>(producer: F) -> Result<Self, SourceError>
    where
        F: FnOnce(&mut LineSink) -> ProducerOutcome + Send + 'static,
    {
        Self::start(None, producer)
    }

    /// Starts a search producer, honoring the result limit in `options`.
    pub fn search<F>(options: &SearchOptions, producer: F) -> Result<Self, SourceError>
    where
        F: FnOnce(&SearchOptions, &mut LineSink) -> ProducerOutcome + Send + 'static,
    {
        let owned = options.clone();
        Self::start(options.effective_limit(), move |sink| producer(&owned, sink))
    }

    fn start<F>(limit: Option<usize>, producer: F) -> Result<Self, SourceError>
    where
        F: FnOnce(&mut LineSink) -> ProducerOutcome + Send + 'static,
    {
        let (sender, receiver) = bounded(LINE_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();
        let mut sink = LineSink {
            sender,
            cancel: cancel.clone(),
            limit,
            sent: 0,
        };

        let handle = thread::Builder::new()
            .name("tabula-source".into())
            .spawn(move || {
                let outcome = producer(&mut sink);
                tracing::trace!(target: targets::SOURCE, sent = sink.sent(), "producer finished");
                outcome
            })
            .map_err(|e| SourceError::Producer(e.to_string()))?;

        tracing::debug!(target: targets::SOURCE, ?limit, "result stream started");
        Ok(Self {
            lines: Some(receiver),
            cancel,
            handle: Some(handle),
            received: 0,
        })
    }

    /// Requests that the producer stop; iteration ends at the next call.
    pub fn cancel(&self) {
        tracing::debug!(target: targets::SOURCE, received = self.received, "result stream cancelled");
        self.cancel.cancel();
    }

    /// Returns `true` if [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the number of lines yielded so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Ends the sequence and returns the producer's outcome.
    ///
    /// Lines not yet consumed are discarded. A cancelled producer still
    /// reports its count.
    pub fn finish(mut self) -> Result<u64, SourceError> {
        drop(self.lines.take());
        let outcome = match self.handle.take().map(JoinHandle::join) {
            Some(Ok(outcome)) => outcome,
            Some(Err(_)) | None => Err(SourceError::Disconnected),
        };

        match outcome {
            Ok(code) if code < 0 => {
                tracing::warn!(target: targets::SOURCE, code, "result source failed");
                Err(SourceError::Failed { code })
            }
            Ok(count) => {
                tracing::debug!(target: targets::SOURCE, count, received = self.received, "result stream finished");
                Ok(count.unsigned_abs())
            }
            Err(err) => {
                tracing::warn!(target: targets::SOURCE, error = %err, "result source failed");
                Err(err)
            }
        }
    }

    /// Consumes the stream into `model` in batches, then reports the outcome.
    ///
    /// The first batch replaces the model's rows; later batches append.
    pub fn populate<F>(mut self, model: &TableModel, batch_size: usize, convert: F) -> Result<u64, SourceError>
    where
        F: FnMut(String) -> Row,
    {
        let mut batcher = RowBatcher::new(model, batch_size, convert);
        for line in self.by_ref() {
            batcher.push(line);
        }
        batcher.finish();
        self.finish()
    }
}

impl Iterator for ResultStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let mut line = self.lines.as_ref()?.recv().ok()?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        self.received += 1;
        Some(line)
    }
}

impl Drop for ResultStream {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
            // Unblocks a producer waiting on a full queue.
            drop(self.lines.take());
        }
    }
}

/// Applies converted lines to a model, one batch per notification.
///
/// The first batch resets the model so earlier results are replaced
/// atomically; later batches are appended. A batch is never partially
/// visible to the model's observers.
pub struct RowBatcher<'a, F> {
    model: &'a TableModel,
    convert: F,
    batch_size: usize,
    pending: Vec<RowRef>,
    batches: usize,
    rows: usize,
}

impl<'a, F> RowBatcher<'a, F>
where
    F: FnMut(String) -> Row,
{
    /// Creates a batcher applying `batch_size` rows at a time.
    pub fn new(model: &'a TableModel, batch_size: usize, convert: F) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            model,
            convert,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            batches: 0,
            rows: 0,
        }
    }

    /// Converts and queues one line, applying the batch when it is full.
    pub fn push(&mut self, line: String) {
        self.pending.push(RowRef::new((self.convert)(line)));
        if self.pending.len() >= self.batch_size {
            self.flush();
        }
    }

    /// Applies queued rows now.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        let len = batch.len();
        if self.batches == 0 {
            self.model.reset(batch);
        } else {
            self.model.append_rows(batch);
        }
        self.batches += 1;
        self.rows += len;
        tracing::trace!(target: targets::SOURCE, batch = self.batches, len, "applied result batch");
    }

    /// Applies the remainder and returns the number of rows applied.
    ///
    /// If no line arrived at all the model is cleared, so stale results
    /// never outlive a search that found nothing.
    pub fn finish(mut self) -> usize {
        self.flush();
        if self.batches == 0 {
            self.model.clear();
        }
        self.rows
    }
}

/// Splits a path into a `[directory, name]` row.
///
/// The directory keeps a lone leading `/` but otherwise loses trailing
/// separators: `/usr/bin/env` gives `["/usr/bin", "env"]` and `/env` gives
/// `["/", "env"]`.
pub fn split_path(path: &str) -> Row {
    let (directory, name) = match path.rfind('/') {
        None => ("", path),
        Some(at) => {
            let head = &path[..=at];
            let trimmed = head.trim_end_matches('/');
            (if trimmed.is_empty() { head } else { trimmed }, &path[at + 1..])
        }
    };
    Row::sequence([directory, name])
}
