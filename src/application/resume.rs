//! Acknowledged stream positions.
//!
//! A session issues one [`BatchTicket`] per batch it hands to the pipeline.
//! Every job derived from the batch holds a clone and calls
//! [`BatchTicket::done`] once its work is applied. The batch counts as
//! processed when every clone has been marked done; a clone dropped without
//! that (an aborted task, a dropped queue) abandons the batch. The cursor only
//! advances over an unbroken run of processed batches, so a reconnect never
//! skips work that was lost or is still in flight.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::domain::id::EventPosition;

#[derive(Debug)]
enum Completion {
    Processed(Option<EventPosition>),
    Abandoned,
}

#[derive(Debug, Default)]
struct CursorState {
    /// Bumped by [`ResumeCursor::recover`]; tickets of older generations
    /// no longer count.
    generation: u64,
    next_issue: u64,
    next_ack: u64,
    completed: BTreeMap<u64, Completion>,
    acknowledged: Option<EventPosition>,
}

/// Last fully processed position of one session group.
#[derive(Debug, Default)]
pub struct ResumeCursor {
    state: Mutex<CursorState>,
}

impl ResumeCursor {
    /// Create a cursor, optionally starting from a known position.
    #[must_use]
    pub fn new(initial: Option<EventPosition>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CursorState {
                acknowledged: initial,
                ..CursorState::default()
            }),
        })
    }

    /// Issue the ticket for the next batch in stream order.
    #[must_use]
    pub fn issue(self: &Arc<Self>, position: Option<EventPosition>) -> BatchTicket {
        let (generation, seq) = {
            let mut state = self.state.lock();
            let seq = state.next_issue;
            state.next_issue += 1;
            (state.generation, seq)
        };
        BatchTicket {
            inner: Arc::new(TicketInner {
                cursor: Arc::clone(self),
                generation,
                seq,
                position: Mutex::new(position),
                abandoned: AtomicBool::new(false),
            }),
            done: false,
        }
    }

    /// Position to resume from after a reconnect.
    #[must_use]
    pub fn acknowledged(&self) -> Option<EventPosition> {
        self.state.lock().acknowledged.clone()
    }

    /// Batches issued but not yet acknowledged.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        let state = self.state.lock();
        state.next_issue - state.next_ack
    }

    /// True when the oldest outstanding batch was abandoned, so the cursor
    /// cannot advance until [`recover`](Self::recover) is called.
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        let state = self.state.lock();
        matches!(
            state.completed.get(&state.next_ack),
            Some(Completion::Abandoned)
        )
    }

    /// Forget every outstanding batch of a stalled cursor.
    ///
    /// Called before reconnecting: the stream replays from
    /// [`acknowledged`](Self::acknowledged), so the abandoned batch and
    /// everything after it is delivered again under fresh tickets. Returns
    /// false when the cursor was not stalled.
    pub fn recover(&self) -> bool {
        let mut state = self.state.lock();
        if !matches!(
            state.completed.get(&state.next_ack),
            Some(Completion::Abandoned)
        ) {
            return false;
        }
        state.generation += 1;
        state.completed.clear();
        state.next_ack = state.next_issue;
        true
    }

    fn finish(&self, generation: u64, seq: u64, completion: Completion) {
        let mut state = self.state.lock();
        if generation != state.generation {
            return;
        }
        state.completed.insert(seq, completion);
        loop {
            let next = state.next_ack;
            match state.completed.get(&next) {
                Some(Completion::Processed(_)) => {}
                Some(Completion::Abandoned) | None => break,
            }
            if let Some(Completion::Processed(Some(position))) = state.completed.remove(&next) {
                state.acknowledged = Some(position);
            }
            state.next_ack += 1;
        }
    }
}

#[derive(Debug)]
struct TicketInner {
    cursor: Arc<ResumeCursor>,
    generation: u64,
    seq: u64,
    position: Mutex<Option<EventPosition>>,
    abandoned: AtomicBool,
}

impl Drop for TicketInner {
    fn drop(&mut self) {
        let completion = if self.abandoned.load(Ordering::Acquire) {
            warn!(seq = self.seq, "Batch abandoned before processing, cursor held back");
            Completion::Abandoned
        } else {
            Completion::Processed(self.position.get_mut().take())
        };
        self.cursor.finish(self.generation, self.seq, completion);
    }
}

/// Completion token for one batch.
///
/// Cloning hands out another share of the batch's work. Each share must be
/// released with [`done`](Self::done); dropping it any other way abandons the
/// batch.
#[derive(Debug)]
pub struct BatchTicket {
    inner: Arc<TicketInner>,
    done: bool,
}

impl BatchTicket {
    /// Stream order of the batch within its group.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.inner.seq
    }

    /// Mark this share of the batch as processed.
    pub fn done(mut self) {
        self.done = true;
    }
}

impl Clone for BatchTicket {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            done: false,
        }
    }
}

impl Drop for BatchTicket {
    fn drop(&mut self) {
        if !self.done {
            self.inner.abandoned.store(true, Ordering::Release);
        }
    }
}
