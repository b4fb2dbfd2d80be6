use image::DynamicImage;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::providers::TranslationResult;
use crate::service::TranslationService;

/// Observable state of one capture session, rendered by the overlay.
/// `cursor` is -1 only while `entries` is empty; otherwise it always points
/// at a valid entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub entries: Vec<String>,
    pub cursor: i32,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: -1,
            is_loading: false,
            error: None,
        }
    }
}

impl UiState {
    pub fn current_text(&self) -> Option<&str> {
        if self.cursor >= 0 && (self.cursor as usize) < self.entries.len() {
            Some(self.entries[self.cursor as usize].as_str())
        } else {
            None
        }
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn can_go_previous(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor >= 0 && (self.cursor as usize) < self.entries.len().saturating_sub(1)
    }
}

/// Holds the translation history of the current capture session and drives
/// requests on a background task. At most one translation is in flight; the
/// `is_loading` flag on the published state is the sole guard.
pub struct SessionController {
    service: Arc<TranslationService>,
    state: Arc<watch::Sender<UiState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(service: Arc<TranslationService>) -> Self {
        let (state, _) = watch::channel(UiState::default());
        Self {
            service,
            state: Arc::new(state),
            task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UiState {
        self.state.borrow().clone()
    }

    /// Starts a translation for the capture. No-op while a request is in
    /// flight. Results are published through the state channel; a torn-down
    /// controller aborts the task so nothing lands after teardown.
    pub fn submit(&self, image: DynamicImage) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if self.state.borrow().is_loading {
            debug!("translation already in flight; ignoring submit");
            return;
        }
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        // a finished task can still be parked here; never leave two handles
        if let Some(stale) = task.take() {
            stale.abort();
        }

        let service = self.service.clone();
        let state = self.state.clone();
        *task = Some(tokio::spawn(async move {
            let result = service.translate(&image).await;
            state.send_modify(|state| {
                state.is_loading = false;
                match result {
                    TranslationResult::Success { translated_text } => {
                        state.entries.push(translated_text);
                        // stay on the current page; only a fresh session
                        // jumps to the first entry
                        if state.cursor == -1 {
                            state.cursor = 0;
                        }
                    }
                    TranslationResult::Error(error) => {
                        state.error = Some(error.message);
                    }
                }
            });
        }));
    }

    pub fn previous(&self) {
        self.state.send_modify(|state| {
            if state.can_go_previous() {
                state.cursor -= 1;
            }
        });
    }

    pub fn next(&self) {
        self.state.send_modify(|state| {
            if state.can_go_next() {
                state.cursor += 1;
            }
        });
    }

    /// Drops the history and returns to the initial state. Any in-flight
    /// request is aborted; letting it land would break the single-flight
    /// guard for the next submit.
    pub fn clear(&self) {
        self.abort_in_flight();
        self.state.send_replace(UiState::default());
    }

    /// Publishes an out-of-band failure (capture, permissions). Clearing the
    /// loading flag re-arms `submit`, so any translation still in flight is
    /// cancelled first to keep at most one running.
    pub fn report_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.abort_in_flight();
        self.state.send_modify(|state| {
            state.is_loading = false;
            state.error = Some(message);
        });
    }

    /// Tears the session down: the in-flight request (if any) is cancelled
    /// and no state update will be observed afterwards.
    pub fn shutdown(&self) {
        self.abort_in_flight();
    }

    fn abort_in_flight(&self) {
        if let Ok(mut task) = self.task.lock()
            && let Some(handle) = task.take()
        {
            handle.abort();
            self.state.send_modify(|state| {
                state.is_loading = false;
            });
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
