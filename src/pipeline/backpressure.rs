use crate::pipeline::channel::Sender;
use std::time::Duration;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

/// Outcome of offering an item to a bounded channel.
#[derive(Debug)]
pub enum Admission<T> {
    Accepted,
    /// No capacity freed up within the patience window; the item is returned
    /// so the caller can account for it.
    Full(T),
    /// Every receiver is gone.
    Closed(T),
}

impl<T> Admission<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }
}

/// Bounded-wait-then-drop admission.
///
/// Tries to enqueue immediately; if the channel is full, waits at most
/// `patience` for capacity. Never blocks longer than that.
pub async fn offer<T>(tx: &Sender<T>, item: T, patience: Duration) -> Admission<T> {
    match tx.try_send(item) {
        Ok(()) => Admission::Accepted,
        Err(TrySendError::Closed(item)) => Admission::Closed(item),
        Err(TrySendError::Full(item)) if patience.is_zero() => Admission::Full(item),
        Err(TrySendError::Full(item)) => match tx.send_timeout(item, patience).await {
            Ok(()) => Admission::Accepted,
            Err(SendTimeoutError::Timeout(item)) => Admission::Full(item),
            Err(SendTimeoutError::Closed(item)) => Admission::Closed(item),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::channel::create_channel;
    use std::time::Instant;

    #[tokio::test]
    async fn test_accepts_with_capacity() {
        let (tx, mut rx) = create_channel(1);
        assert!(offer(&tx, 1, Duration::ZERO).await.is_accepted());
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test]
    async fn test_zero_patience_drops_immediately() {
        let (tx, _rx) = create_channel(1);
        assert!(offer(&tx, 1, Duration::ZERO).await.is_accepted());

        match offer(&tx, 2, Duration::ZERO).await {
            Admission::Full(item) => assert_eq!(item, 2),
            other => panic!("expected Full, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_patience_is_bounded() {
        let (tx, _rx) = create_channel(1);
        offer(&tx, 1, Duration::ZERO).await;

        let start = Instant::now();
        let admission = offer(&tx, 2, Duration::from_millis(30)).await;
        assert!(matches!(admission, Admission::Full(2)));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_waits_for_capacity_within_patience() {
        let (tx, mut rx) = create_channel(1);
        offer(&tx, 1, Duration::ZERO).await;

        let drain = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let first = rx.recv().await;
            let second = rx.recv().await;
            (first, second)
        });

        assert!(offer(&tx, 2, Duration::from_secs(5)).await.is_accepted());
        drop(tx);
        assert_eq!(drain.await.unwrap(), (Some(1), Some(2)));
    }

    #[tokio::test]
    async fn test_closed_channel_returns_item() {
        let (tx, rx) = create_channel::<u8>(1);
        drop(rx);
        assert!(matches!(
            offer(&tx, 7, Duration::from_secs(1)).await,
            Admission::Closed(7)
        ));
    }
}
