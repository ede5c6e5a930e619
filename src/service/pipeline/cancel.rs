//! Run cancellation: a caller-held handle plus an optional deadline
//!
//! The HTTP API only sets deadlines. A client that disconnects drops the request future,
//! and with it the run, so no handle is needed there.

use std::future::pending;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Fires the paired [`CancelSignal`]
#[cfg(test)]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

#[cfg(test)]
impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cancellation observed by one pipeline run
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Create a connected handle and signal
#[cfg(test)]
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (
        CancelHandle { tx },
        CancelSignal {
            rx: Some(rx),
            deadline: None,
        },
    )
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self {
            rx: None,
            deadline: None,
        }
    }

    /// Also fire once `timeout` has elapsed from now; the earlier deadline wins
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    fn flagged(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flagged() || self.expired()
    }

    /// Human-readable cause, used as the failure message
    pub fn reason(&self) -> &'static str {
        if self.flagged() {
            "Run cancelled by caller"
        } else if self.expired() {
            "Run deadline exceeded"
        } else {
            "Run cancelled"
        }
    }

    /// Resolves once the signal fires; pending forever for [`CancelSignal::never`]
    pub async fn cancelled(&self) {
        let flag = async {
            match &self.rx {
                Some(rx) => {
                    let mut rx = rx.clone();
                    // A dropped handle can no longer cancel
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = flag => {}
            _ = deadline => {}
        }
    }
}
