//! Pipeline lifecycle events
//!
//! Events are delivered synchronously to registered listeners as the run
//! progresses. Listeners are infallible; reporting built on top of them
//! cannot affect run status.

use std::sync::Arc;

use crate::report::PipelineReport;

use super::{RunStatus, StageName};

/// A lifecycle notification emitted by the coordinator.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    PipelineStart,
    StageStart {
        stage: StageName,
    },
    StageComplete {
        stage: StageName,
        passed: usize,
        failed: usize,
    },
    StageFail {
        stage: StageName,
        failed: usize,
    },
    /// Stage disabled by configuration or skipped after a bail.
    StageSkipped {
        stage: StageName,
    },
    PipelineComplete {
        status: RunStatus,
        /// Full result tree of the finished run, so listeners can report
        /// without going through the `run` return value.
        report: PipelineReport,
    },
}

pub type EventListener = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Ordered set of event listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Vec<EventListener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: EventListener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &PipelineEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn listeners_receive_events_in_subscription_order() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        for tag in ["first", "second"] {
            let seen = seen.clone();
            bus.subscribe(Arc::new(move |event: &PipelineEvent| {
                if let PipelineEvent::StageStart { stage } = event {
                    seen.lock().unwrap().push(format!("{tag}:{stage}"));
                }
            }));
        }

        bus.emit(&PipelineEvent::StageStart {
            stage: StageName::Unit,
        });

        assert_eq!(*seen.lock().unwrap(), vec!["first:unit", "second:unit"]);
        assert_eq!(bus.listener_count(), 2);
    }
}
