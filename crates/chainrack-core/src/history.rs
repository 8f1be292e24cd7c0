//! Bounded undo/redo history built on serialized pipeline state.
//!
//! Restoring an entry replays it through the same code paths a user edit
//! would take. Those paths try to record history, so a restore carries a
//! [`ReplayInProgress`] marker down the call path and saves made under it are
//! suppressed. The marker is a value, not a timer: it ends exactly when the
//! restore returns.

use crate::codec::{self, PersistedPlugin};
use crate::events::EventSender;
use crate::pipeline::Pipeline;
use crate::pipeline_set::{PipelineSet, Selector};
use crate::registry::PluginRegistry;
use std::collections::VecDeque;

/// Serialized snapshot of both pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub a: Vec<PersistedPlugin>,
    pub b: Option<Vec<PersistedPlugin>>,
    pub active: Selector,
}

impl HistoryEntry {
    pub fn capture(set: &PipelineSet) -> Self {
        Self {
            a: codec::serialize_for_persistence(set.a()),
            b: set.b().map(codec::serialize_for_persistence),
            active: set.selector(),
        }
    }
}

/// Proof that a history replay is running. Only this module creates one.
#[derive(Debug)]
pub struct ReplayInProgress {
    _private: (),
}

impl ReplayInProgress {
    pub(crate) fn begin() -> Self {
        Self { _private: () }
    }
}

/// Where an edit came from.
#[derive(Debug, Clone, Copy)]
pub enum EditOrigin<'a> {
    User,
    Replay(&'a ReplayInProgress),
}

impl EditOrigin<'_> {
    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replay(_))
    }
}

/// Bounded list of entries with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    /// Index of the entry that matches the live state; `None` when empty.
    cursor: Option<usize>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: None,
            capacity,
        }
    }

    /// Drop everything after the cursor, append, and evict the oldest entry
    /// if over capacity.
    pub fn push(&mut self, entry: HistoryEntry) {
        match self.cursor {
            Some(cursor) => self.entries.truncate(cursor + 1),
            None => self.entries.clear(),
        }
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    pub fn step_back(&mut self) -> Option<&HistoryEntry> {
        match self.cursor {
            Some(cursor) if cursor > 0 => {
                self.cursor = Some(cursor - 1);
                self.entries.get(cursor - 1)
            }
            _ => None,
        }
    }

    pub fn step_forward(&mut self) -> Option<&HistoryEntry> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.entries.len() => {
                self.cursor = Some(cursor + 1);
                self.entries.get(cursor + 1)
            }
            _ => None,
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}

/// Undo/redo over a [`PipelineSet`].
#[derive(Debug)]
pub struct HistoryManager {
    history: History,
    record_next_replay: bool,
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: History::new(capacity),
            record_next_replay: false,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Let the next save made under a replay through. Used when a replayed
    /// operation, such as loading a preset, must itself be undoable.
    pub fn record_next_replay(&mut self) {
        self.record_next_replay = true;
    }

    /// Snapshot `set` as a new entry.
    ///
    /// Returns `false` when suppressed by an in-progress replay, or when the
    /// snapshot equals the entry at the cursor.
    pub fn save_state(&mut self, set: &PipelineSet, origin: EditOrigin<'_>) -> bool {
        if origin.is_replay() {
            if !self.record_next_replay {
                tracing::trace!("History save suppressed during replay");
                return false;
            }
            self.record_next_replay = false;
        }
        let entry = HistoryEntry::capture(set);
        if self.history.current() == Some(&entry) {
            tracing::trace!("History save skipped, state unchanged");
            return false;
        }
        self.history.push(entry);
        true
    }

    /// Restore the previous entry. Returns `false` at the oldest entry.
    pub fn undo(
        &mut self,
        set: &mut PipelineSet,
        registry: &PluginRegistry,
        events: Option<&EventSender>,
    ) -> bool {
        let Some(entry) = self.history.step_back().cloned() else {
            return false;
        };
        let replay = ReplayInProgress::begin();
        self.replay(set, &entry, registry, events, &replay);
        tracing::info!("Undo to history entry {:?}", self.history.cursor());
        true
    }

    /// Restore the next entry. Returns `false` at the newest entry.
    pub fn redo(
        &mut self,
        set: &mut PipelineSet,
        registry: &PluginRegistry,
        events: Option<&EventSender>,
    ) -> bool {
        let Some(entry) = self.history.step_forward().cloned() else {
            return false;
        };
        let replay = ReplayInProgress::begin();
        self.replay(set, &entry, registry, events, &replay);
        tracing::info!("Redo to history entry {:?}", self.history.cursor());
        true
    }

    fn replay(
        &mut self,
        set: &mut PipelineSet,
        entry: &HistoryEntry,
        registry: &PluginRegistry,
        events: Option<&EventSender>,
        replay: &ReplayInProgress,
    ) {
        let skipped = restore(set, entry, registry, events, replay);
        if !skipped.is_empty() {
            tracing::warn!("History restore skipped {} plugins", skipped.len());
        }
        // Restores go through the regular edit path, which records history;
        // under the marker this is a no-op.
        self.save_state(set, EditOrigin::Replay(replay));
    }
}

/// Rebuild `set` from `entry`.
///
/// Every live instance is released before its replacement is constructed
/// through the registry, parameters are re-applied through
/// `set_parameters`, and master bypass ends up off. Returns the type ids of
/// records that could not be reconstructed.
pub fn restore(
    set: &mut PipelineSet,
    entry: &HistoryEntry,
    registry: &PluginRegistry,
    events: Option<&EventSender>,
    _replay: &ReplayInProgress,
) -> Vec<String> {
    teardown(set.a());
    if let Some(b) = set.b() {
        teardown(b);
    }
    let record = codec::SetRecord {
        a: entry.a.clone(),
        b: entry.b.clone(),
        active: entry.active,
    };
    set.load_record(&record, registry, events)
}

fn teardown(pipeline: &Pipeline) {
    for instance in pipeline.iter() {
        instance.release();
    }
}
