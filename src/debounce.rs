//! Search input debouncing.
//!
//! Search boxes generate a keystroke per character, but each distinct search
//! costs a fetch. The [`SearchDebouncer`] sits between the input and the
//! controller's `set_search`: every keystroke updates a locally buffered
//! value immediately (so the input echoes without lag) and restarts a
//! single-flight timer; only the timer's expiry emits a settled value.
//! Restarting cancels the previous timer, so within one delay window only
//! the last keystroke reaches the controller.
//!
//! Dropping the debouncer aborts any pending timer — no settled value can
//! arrive after disposal.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() {
//! use listflow::SearchDebouncer;
//!
//! let mut debounce = SearchDebouncer::default();
//! debounce.input("a");
//! debounce.input("ad");
//! debounce.input("ada");
//! // 500ms later, exactly one value settles:
//! assert_eq!(debounce.settled().await.as_deref(), Some("ada"));
//! # }
//! ```

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Default settle delay, matching the conventional 500ms search debounce.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Single-flight debounce timer for search input.
pub struct SearchDebouncer {
    delay: Duration,
    buffered: String,
    timer: Option<JoinHandle<()>>,
    tx: UnboundedSender<String>,
    rx: UnboundedReceiver<String>,
}

impl SearchDebouncer {
    /// Creates a debouncer with the given settle delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delay,
            buffered: String::new(),
            timer: None,
            tx,
            rx,
        }
    }

    /// The immediately-echoed value of the last keystroke.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.buffered
    }

    /// Records a keystroke: updates the buffered value and (re)starts the
    /// settle timer, cancelling any previous one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn input(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.buffered.clone_from(&value);

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let tx = self.tx.clone();
        let delay = self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver dropped means the debouncer is gone; nothing to do.
            let _ = tx.send(value);
        }));
    }

    /// Waits for the next settled value.
    ///
    /// Returns `None` only if the debouncer is torn down mid-wait, which
    /// cannot happen while the caller holds it.
    pub async fn settled(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Returns a settled value without waiting, if one is ready.
    pub fn try_settled(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
