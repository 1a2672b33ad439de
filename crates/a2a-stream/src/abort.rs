use tokio::sync::watch;

/// Handle used to cancel one in-flight stream.
///
/// A handle is created per request and never reused; aborting it ends the
/// bound stream cleanly instead of surfacing an error.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Creates a handle and the signal observed by the stream.
    pub fn pair() -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, AbortSignal { rx })
    }

    /// Requests cancellation. Calling it again is a no-op.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once `abort` has been called.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side of an [`AbortHandle`].
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Returns `true` if the paired handle has been aborted.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the paired handle is aborted.
    ///
    /// Never resolves if the handle is dropped without aborting, so a stream
    /// outlives a client that was simply dropped.
    pub async fn aborted(&mut self) {
        if self.rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
