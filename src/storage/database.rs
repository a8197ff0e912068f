use chrono::NaiveDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{Result, TrckrError};

use super::{
    entities::{ActiveTimer, Entry, Meta, StoreDocument},
    port::DocumentPort,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
}

/// Owns the timer and the committed entries. Every operation works on memory only, nothing
/// reaches the port until [EntryStore::commit].
pub struct EntryStore<P> {
    port: P,
    document: StoreDocument,
}

impl<P: DocumentPort> EntryStore<P> {
    /// Loads the persisted document, or starts from an empty one.
    #[instrument(skip_all)]
    pub async fn open(port: P) -> Result<Self> {
        let document = port.read(StoreDocument::default()).await?;
        debug!(
            "Loaded {} entries, timer running: {}",
            document.entries.len(),
            document.timer.is_some()
        );
        Ok(Self { port, document })
    }

    /// Writes the whole document. A failed commit leaves memory as it was, so it can simply be
    /// tried again.
    #[instrument(skip_all)]
    pub async fn commit(&self) -> Result<()> {
        self.port.write(&self.document).await?;
        info!("Committed {} entries", self.document.entries.len());
        Ok(())
    }

    pub fn state(&self) -> TimerState {
        match self.document.timer {
            Some(_) => TimerState::Running,
            None => TimerState::Idle,
        }
    }

    pub fn timer(&self) -> Option<&ActiveTimer> {
        self.document.timer.as_ref()
    }

    /// All committed entries as stored, in the order they were added.
    pub fn entries(&self) -> &[Entry] {
        &self.document.entries
    }

    /// Starts a new timer. A timer that is already running is stopped at `time` first and the
    /// entry it turned into is returned.
    pub fn start(&mut self, time: NaiveDateTime, meta: Meta) -> Option<Entry> {
        let stopped = self.finish_timer(time).cloned();
        let timer = ActiveTimer {
            id: generate_id(),
            start: time,
            meta,
        };
        debug!("Started timer {} at {time}", timer.id);
        self.document.timer = Some(timer);
        stopped
    }

    /// Stops the running timer at `time`. Fails without touching anything when there is none.
    pub fn stop(&mut self, time: NaiveDateTime) -> Result<&Entry> {
        self.finish_timer(time).ok_or(TrckrError::NoActiveTimer)
    }

    /// Adds a finished interval directly, regardless of the timer.
    pub fn add(&mut self, start: NaiveDateTime, stop: NaiveDateTime, meta: Meta) -> Result<&Entry> {
        if stop < start {
            return Err(TrckrError::InvertedInterval { start, stop });
        }
        let entry = Entry {
            id: generate_id(),
            start,
            stop,
            meta,
        };
        debug!("Added entry {} {start} - {stop}", entry.id);
        Ok(self.push(entry))
    }

    /// Returns committed entries overlapping `from..to`, clipped to it. The clipped entries are
    /// copies, stored entries stay untouched.
    pub fn select(&self, from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> Vec<Entry> {
        self.document
            .entries
            .iter()
            .filter_map(|entry| entry.intersection(from, to))
            .collect()
    }

    fn finish_timer(&mut self, time: NaiveDateTime) -> Option<&Entry> {
        let timer = self.document.timer.take()?;
        debug!("Stopped timer {} at {time}", timer.id);
        Some(self.push(timer.finish(time)))
    }

    fn push(&mut self, entry: Entry) -> &Entry {
        self.document.entries.push(entry);
        // Can't be empty right after a push.
        &self.document.entries[self.document.entries.len() - 1]
    }
}

fn generate_id() -> std::sync::Arc<str> {
    Uuid::new_v4().to_string().into()
}
