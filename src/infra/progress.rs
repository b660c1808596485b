// ============================================================
// Layer 6 - Progress Publisher
// ============================================================
// One-way push channel from a training run to its listener.
//
//   trainer (blocking thread)  ──publish──▶  mpsc::UnboundedSender
//                                                 │
//   listener (async task)      ◀──recv()──────────┘
//
// The unbounded sender never blocks the training thread. After a
// terminal event (completed / error) the publisher goes quiet:
// anything published later is dropped with a warning, so a
// listener always sees exactly one terminal event, last.

use tokio::sync::mpsc;

use crate::domain::events::TrainingEvent;
use crate::domain::traits::ProgressSink;

pub type EventReceiver = mpsc::UnboundedReceiver<TrainingEvent>;

pub struct ProgressPublisher {
    tx:       mpsc::UnboundedSender<TrainingEvent>,
    finished: bool,
}

impl ProgressPublisher {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, finished: false }, rx)
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool { self.finished }
}

impl ProgressSink for ProgressPublisher {
    fn publish(&mut self, event: TrainingEvent) {
        if self.finished {
            tracing::warn!("Dropping event after the run finished: {:?}", event);
            return;
        }
        self.finished = event.is_terminal();
        if self.tx.send(event).is_err() {
            // listener went away; training carries on regardless
            tracing::debug!("Progress listener disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{EpochMetrics, EvaluationReport};

    fn progress(epoch: usize) -> TrainingEvent {
        TrainingEvent::Progress { epoch, progress: 10.0 * epoch as f64, metrics: EpochMetrics::default() }
    }

    #[test]
    fn test_nothing_follows_a_terminal_event() {
        let (mut publisher, mut rx) = ProgressPublisher::channel();
        publisher.publish(progress(1));
        publisher.publish(TrainingEvent::Completed(EvaluationReport::default()));
        publisher.publish(progress(2));
        publisher.publish(TrainingEvent::Error { error: "late".into() });
        assert!(publisher.is_finished());
        drop(publisher);

        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], progress(1));
        assert!(matches!(events[1], TrainingEvent::Completed(_)));
    }

    #[test]
    fn test_closed_listener_does_not_panic() {
        let (mut publisher, rx) = ProgressPublisher::channel();
        drop(rx);
        publisher.publish(progress(1));
        publisher.publish(TrainingEvent::Error { error: "x".into() });
        assert!(publisher.is_finished());
    }
}
