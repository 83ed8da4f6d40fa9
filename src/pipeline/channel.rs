use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub type Sender<T> = mpsc::Sender<T>;
pub type Receiver<T> = mpsc::Receiver<T>;

/// Create a bounded channel with the specified buffer size
pub fn create_channel<T>(buffer_size: usize) -> (Sender<T>, Receiver<T>) {
    mpsc::channel(buffer_size)
}

/// Receiving end of a bounded channel shared by a pool of consumers.
///
/// Consumers take turns waiting on the underlying receiver; each item goes to
/// exactly one of them.
#[derive(Debug)]
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<Receiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    pub fn new(receiver: Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Receive the next item; `None` once every sender is gone and the
    /// channel is drained. Cancel safe.
    pub async fn recv(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}

/// Create a bounded channel whose receiver can be cloned across consumers.
pub fn create_shared_channel<T>(buffer_size: usize) -> (Sender<T>, SharedReceiver<T>) {
    let (tx, rx) = create_channel(buffer_size);
    (tx, SharedReceiver::new(rx))
}
