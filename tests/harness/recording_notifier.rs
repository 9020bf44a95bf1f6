use std::sync::{Arc, Mutex};
use std::time::Duration;

use sharpline::domain::opportunity::{Opportunity, OpportunityKind};
use sharpline::port::outbound::notifier::{Event, Notifier, WithdrawnEvent};

/// Thread-safe event collector for notification assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("lock notifier events").len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("lock notifier events").clone()
    }

    pub fn opportunities(&self) -> Vec<Arc<Opportunity>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::OpportunityDetected(o) => Some(o),
                _ => None,
            })
            .collect()
    }

    pub fn of_kind(&self, kind: OpportunityKind) -> Vec<Arc<Opportunity>> {
        self.opportunities()
            .into_iter()
            .filter(|o| o.kind == kind)
            .collect()
    }

    pub fn withdrawals(&self) -> Vec<WithdrawnEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::OpportunityWithdrawn(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    /// Poll until `predicate` holds or `timeout` elapses.
    pub async fn wait_for(&self, timeout: Duration, predicate: impl Fn(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if predicate(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        predicate(self)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events
            .lock()
            .expect("lock notifier events")
            .push(event);
    }
}
