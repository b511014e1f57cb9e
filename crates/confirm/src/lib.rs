//! A single, app-wide confirmation prompt
//!
//! [`ConfirmDialog::confirm`] shows the prompt and hands back a
//! [`ConfirmHandle`] that resolves once the user answers through
//! [`on_confirm`](ConfirmDialog::on_confirm) or
//! [`on_cancel`](ConfirmDialog::on_cancel). The UI renders whatever
//! [`DialogState`] it observes via [`subscribe`](ConfirmDialog::subscribe).
//!
//! Only one prompt exists at a time. Opening a second prompt while the first
//! is still showing replaces it, and the first handle never resolves.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::{oneshot, watch};

/// What the prompt currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogState {
    pub visible: bool,
    pub title: String,
    pub message: String,
}

struct Inner {
    state: watch::Sender<DialogState>,
    pending: Mutex<Option<oneshot::Sender<bool>>>,
}

/// Cheap to clone; all clones drive the same prompt
#[derive(Clone)]
pub struct ConfirmDialog {
    inner: Arc<Inner>,
}

impl Default for ConfirmDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmDialog {
    pub fn new() -> Self {
        let (state, _) = watch::channel(DialogState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                pending: Mutex::new(None),
            }),
        }
    }

    /// Show the prompt and wait for the user's answer
    pub fn confirm(&self, title: &str, message: &str) -> ConfirmHandle {
        let (tx, rx) = oneshot::channel();

        // a prompt that is still open is orphaned, not answered
        if self.pending().replace(tx).is_some() {
            log::debug!("Replacing an unanswered confirmation prompt");
        }

        self.inner.state.send_replace(DialogState {
            visible: true,
            title: title.to_string(),
            message: message.to_string(),
        });

        ConfirmHandle { answer: rx }
    }

    pub fn on_confirm(&self) {
        self.answer(true);
    }

    pub fn on_cancel(&self) {
        self.answer(false);
    }

    pub fn state(&self) -> DialogState {
        self.inner.state.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().visible
    }

    pub fn subscribe(&self) -> watch::Receiver<DialogState> {
        self.inner.state.subscribe()
    }

    fn answer(&self, confirmed: bool) {
        self.inner.state.send_modify(|state| state.visible = false);

        match self.pending().take() {
            Some(tx) => {
                // the caller may have stopped waiting
                let _ = tx.send(confirmed);
            }
            None => log::debug!("No confirmation prompt is waiting for an answer"),
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<bool>>> {
        self.inner.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resolves to `true` when confirmed and `false` when cancelled.
///
/// A handle whose prompt was replaced by a newer one stays pending forever.
#[must_use = "a confirmation does nothing unless awaited"]
pub struct ConfirmHandle {
    answer: oneshot::Receiver<bool>,
}

impl Future for ConfirmHandle {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        match Pin::new(&mut self.answer).poll(cx) {
            Poll::Ready(Ok(confirmed)) => Poll::Ready(confirmed),
            Poll::Ready(Err(_)) => Poll::Pending,
            Poll::Pending => Poll::Pending,
        }
    }
}
