//! Engine notifications delivered to the control context.
//!
//! The render context reports through a bounded channel with `try_send`; when
//! the queue is full the event is dropped and counted instead of blocking.

use crate::plugin::InstanceId;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Something the host should know about.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A plugin panicked while processing. The instance is bypassed for the
    /// rest of its generation.
    RenderFault {
        instance: InstanceId,
        type_id: Arc<str>,
        generation: u64,
    },
    /// The render context switched to a newly published generation.
    GenerationAdopted { version: u64 },
    /// A block arrived in a format larger than the preallocated buffers and
    /// was passed through unprocessed.
    FormatRejected { channels: usize, block_size: usize },
    /// A requested plugin could not be constructed.
    ConstructionFailed { type_id: String, reason: String },
    /// A persisted record referenced an unavailable plugin type and was skipped.
    RecordSkipped { type_id: String },
}

/// Cloneable, non-blocking event producer.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<EngineEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSender {
    /// Never blocks. Returns `false` if the event was dropped.
    #[inline]
    pub fn emit(&self, event: EngineEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Events lost to a full or closed queue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a bounded event queue.
pub fn event_channel(capacity: usize) -> (EventSender, Receiver<EngineEvent>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (
        EventSender {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}
