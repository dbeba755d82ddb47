use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backend::common::errors::AdbError;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const IDLE_STATUS: &str = "ready";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub(crate) enum OperationPhase {
    Idle,
    Running { id: Uuid, title: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub(crate) enum SchedulerEvent {
    Running { id: Uuid, title: String },
    Ignored { title: String },
    Finished { id: Uuid, title: String, message: String, ok: bool },
    Note { line: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchedulerSnapshot {
    pub(crate) phase: OperationPhase,
    pub(crate) status: String,
    pub(crate) log: Vec<String>,
}

struct SchedulerState {
    phase: OperationPhase,
    status: String,
    log: Vec<String>,
}

impl SchedulerState {
    fn append(&mut self, line: &str) {
        self.log.push(format!("[{}] {line}", clock_stamp()));
    }
}

fn clock_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".to_string())
}

/// Runs at most one operation at a time. Every outcome, including a panic in
/// the body, is folded into the status line and the console log.
#[derive(Clone)]
pub(crate) struct OperationScheduler {
    state: Arc<Mutex<SchedulerState>>,
    events: broadcast::Sender<SchedulerEvent>,
}

impl Default for OperationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationScheduler {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                phase: OperationPhase::Idle,
                status: IDLE_STATUS.to_string(),
                log: Vec::new(),
            })),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: SchedulerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    pub(crate) fn is_busy(&self) -> bool {
        matches!(self.lock().phase, OperationPhase::Running { .. })
    }

    pub(crate) fn snapshot(&self) -> SchedulerSnapshot {
        let state = self.lock();
        SchedulerSnapshot {
            phase: state.phase.clone(),
            status: state.status.clone(),
            log: state.log.clone(),
        }
    }

    /// Appends a console line without touching the status.
    pub(crate) fn note(&self, line: &str) {
        self.lock().append(line);
        self.publish(SchedulerEvent::Note {
            line: line.to_string(),
        });
    }

    /// Sets the status line and logs it, outside any operation.
    pub(crate) fn report(&self, message: &str) {
        {
            let mut state = self.lock();
            state.status = message.to_string();
            state.append(message);
        }
        self.publish(SchedulerEvent::Note {
            line: message.to_string(),
        });
    }

    /// Validation failures never reach dispatch.
    pub(crate) fn reject(&self, error: &AdbError) {
        let message = error.to_string();
        tracing::info!(%message, "operation rejected before dispatch");
        self.report(&message);
    }

    pub(crate) fn clear_log(&self) {
        self.lock().log.clear();
    }

    /// Starts `body` unless another operation is in flight. Must be called
    /// from within a tokio runtime. Returns the completion handle when the
    /// operation was accepted.
    pub(crate) fn dispatch<F>(&self, title: &str, body: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<String, AdbError>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        {
            let mut state = self.lock();
            if let OperationPhase::Running { title: running, .. } = &state.phase {
                tracing::info!(ignored = title, running = %running, "operation ignored while busy");
                state.append(&format!("ignored: {title}"));
                drop(state);
                self.publish(SchedulerEvent::Ignored {
                    title: title.to_string(),
                });
                return None;
            }

            let line = format!("running: {title}");
            state.phase = OperationPhase::Running {
                id,
                title: title.to_string(),
            };
            state.status = line.clone();
            state.append(&line);
        }

        tracing::info!(%id, title, "operation started");
        self.publish(SchedulerEvent::Running {
            id,
            title: title.to_string(),
        });

        let scheduler = self.clone();
        let title = title.to_string();
        Some(tokio::spawn(async move {
            let (message, ok) = match tokio::spawn(body).await {
                Ok(Ok(message)) => (message, true),
                Ok(Err(error)) => (format!("error: {error}"), false),
                Err(join_error) => (format!("error: operation aborted ({join_error})"), false),
            };
            scheduler.finish(id, &title, message, ok);
        }))
    }

    fn finish(&self, id: Uuid, title: &str, message: String, ok: bool) {
        {
            let mut state = self.lock();
            state.status = message.clone();
            state.append(&message);
            state.phase = OperationPhase::Idle;
        }

        if ok {
            tracing::info!(%id, title, "operation finished");
        } else {
            tracing::warn!(%id, title, %message, "operation failed");
        }
        self.publish(SchedulerEvent::Finished {
            id,
            title: title.to_string(),
            message,
            ok,
        });
    }
}
