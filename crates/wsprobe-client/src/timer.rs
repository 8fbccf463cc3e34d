//! One-shot delayed delivery.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delivers a value into a queue after a delay, unless cancelled first.
#[derive(Debug)]
pub struct CloseTimer {
    task: JoinHandle<()>,
}

impl CloseTimer {
    pub fn schedule<T>(delay: Duration, item: T, queue: mpsc::UnboundedSender<T>) -> Self
    where
        T: Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = queue.send(item);
        });
        Self { task }
    }

    /// Stop the timer. Has no effect once it has fired.
    pub fn cancel(self) {
        self.task.abort();
    }
}
