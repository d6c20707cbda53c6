//! Side-channel from the tool worker to an observer (UI, log, history view).
//!
//! Tools and the session worker push [`Notification`]s into a bounded queue.
//! The observer drains it on its own task, so nothing it does can stall or
//! race the conversation loop. Delivery order equals submission order.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Events an observer may want to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    FileWritten { path: String, content: String },
    FileRead { path: String, content: String },
    DirectoryListed { path: String, listing: String },
    CommandFinished {
        command: String,
        output: String,
        exit_code: Option<i32>,
    },
    ToolFinished { tool: String, is_error: bool },
    Status { message: String },
    TurnFinished { reply: String },
    TurnFailed { error: String },
}

/// How long [`Notifier::deliver`] waits for queue room.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Sending half. Cheap to clone; a disabled notifier drops everything.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::Sender<Notification>>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue without waiting. A full queue drops the event: the observer
    /// is lagging and the conversation loop must not wait on it.
    pub fn notify(&self, notification: Notification) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(?dropped, "notification queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("notification observer gone");
            }
        }
    }

    /// Enqueue an event the observer has to see, waiting up to
    /// [`DELIVERY_TIMEOUT`] for room. Only the session worker calls this;
    /// tool paths use [`Notifier::notify`].
    pub async fn deliver(&self, notification: Notification) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tokio::time::timeout(DELIVERY_TIMEOUT, tx.send(notification)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!("notification observer gone"),
            Err(_) => warn!("notification observer stalled, dropping event"),
        }
    }
}

/// Receiving half, owned by the observer's execution context.
#[derive(Debug)]
pub struct NotificationReceiver {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationReceiver {
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Take everything already queued without waiting.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(notification) = self.rx.try_recv() {
            out.push(notification);
        }
        out
    }
}

/// Create a bounded notification queue.
pub fn notification_channel(capacity: usize) -> (Notifier, NotificationReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Notifier { tx: Some(tx) }, NotificationReceiver { rx })
}

/// Something that consumes notifications on its own task.
pub trait Observer: Send + 'static {
    fn on_notification(&mut self, notification: Notification);
}

impl<F> Observer for F
where
    F: FnMut(Notification) + Send + 'static,
{
    fn on_notification(&mut self, notification: Notification) {
        self(notification)
    }
}

/// Drain `receiver` into `observer` until every notifier is dropped.
pub fn spawn_observer<O: Observer>(
    mut receiver: NotificationReceiver,
    mut observer: O,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = receiver.recv().await {
            observer.on_notification(notification);
        }
        debug!("notification observer finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_preserves_submission_order() {
        let (notifier, receiver) = notification_channel(16);
        let seen: Arc<Mutex<Vec<Notification>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = spawn_observer(receiver, move |n: Notification| sink.lock().unwrap().push(n));

        for i in 0..10 {
            notifier.notify(Notification::Status { message: format!("step {i}") });
        }
        drop(notifier);
        handle.await.unwrap();

        let seen = seen.lock().unwrap();
        let expected: Vec<_> = (0..10)
            .map(|i| Notification::Status { message: format!("step {i}") })
            .collect();
        assert_eq!(*seen, expected);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let (notifier, mut receiver) = notification_channel(2);
        notifier.notify(Notification::Status { message: "a".into() });
        notifier.notify(Notification::Status { message: "b".into() });
        notifier.notify(Notification::Status { message: "c".into() });

        let drained = receiver.drain();
        assert_eq!(
            drained,
            vec![
                Notification::Status { message: "a".into() },
                Notification::Status { message: "b".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_deliver_waits_for_room() {
        let (notifier, mut receiver) = notification_channel(1);
        notifier.notify(Notification::Status { message: "first".into() });

        let sender = notifier.clone();
        let pending = tokio::spawn(async move {
            sender
                .deliver(Notification::TurnFinished { reply: "done".into() })
                .await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            receiver.recv().await,
            Some(Notification::Status { message: "first".into() })
        );
        pending.await.unwrap();
        assert_eq!(
            receiver.recv().await,
            Some(Notification::TurnFinished { reply: "done".into() })
        );
    }

    #[tokio::test]
    async fn test_closed_or_disabled_notifier_is_silent() {
        let (notifier, receiver) = notification_channel(4);
        drop(receiver);
        notifier.notify(Notification::Status { message: "nobody listening".into() });

        let disabled = Notifier::disabled();
        disabled.notify(Notification::Status { message: "ignored".into() });
        disabled.deliver(Notification::TurnFailed { error: "ignored".into() }).await;
    }

    #[test]
    fn test_notification_serialization() {
        let json = serde_json::to_value(Notification::FileWritten {
            path: "a.txt".into(),
            content: "hi".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "file_written");
        assert_eq!(json["path"], "a.txt");
    }
}
