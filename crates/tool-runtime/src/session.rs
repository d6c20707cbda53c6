//! Dedicated worker for one interactive session.
//!
//! The worker task owns the [`Conversation`] and is the only place `chat`
//! runs. Callers talk to it through a [`SessionHandle`]; commands queue in a
//! channel and are processed strictly one at a time, so a clear can never
//! land in the middle of a turn.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::conversation::{Content, Conversation, Message};
use crate::notify::{Notification, Notifier};
use crate::runtime::{ChatError, ConversationOrchestrator};

pub const STATUS_THINKING: &str = "Thinking...";
pub const STATUS_READY: &str = "Ready";

const COMMAND_QUEUE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("session worker stopped")]
    WorkerGone,
}

enum Command {
    Send {
        content: Content,
        reply: oneshot::Sender<Result<Message, ChatError>>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    History {
        reply: oneshot::Sender<Conversation>,
    },
    Shutdown,
}

/// Cloneable front end to a running [`SessionWorker`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    /// Append a user message and run one full turn.
    pub async fn send(&self, content: impl Into<Content>) -> Result<Message, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Send {
            content: content.into(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| SessionError::WorkerGone)??)
    }

    /// Reset the history to its system message.
    pub async fn clear(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Clear { reply }).await?;
        rx.await.map_err(|_| SessionError::WorkerGone)
    }

    /// Snapshot of the committed history.
    pub async fn history(&self) -> Result<Conversation, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::History { reply }).await?;
        rx.await.map_err(|_| SessionError::WorkerGone)
    }

    /// Stop the worker once the commands queued before this one are done.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.submit(Command::Shutdown).await
    }

    async fn submit(&self, command: Command) -> Result<(), SessionError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SessionError::WorkerGone)
    }
}

pub struct SessionWorker {
    orchestrator: ConversationOrchestrator,
    conversation: Conversation,
    notifier: Notifier,
    rx: mpsc::Receiver<Command>,
}

impl SessionWorker {
    /// Start the worker on its own task.
    pub fn spawn(
        orchestrator: ConversationOrchestrator,
        conversation: Conversation,
        notifier: Notifier,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let worker = Self {
            orchestrator,
            conversation,
            notifier,
            rx,
        };
        let handle = tokio::spawn(worker.run());
        (SessionHandle { tx }, handle)
    }

    async fn run(mut self) {
        info!(model = self.orchestrator.model(), "session worker started");
        self.status(STATUS_READY);

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Send { content, reply } => {
                    let result = self.turn(content).await;
                    if reply.send(result).is_err() {
                        debug!("turn result discarded, caller went away");
                    }
                }
                Command::Clear { reply } => {
                    self.conversation.clear_to_system();
                    debug!(remaining = self.conversation.len(), "history cleared");
                    let _ = reply.send(());
                }
                Command::History { reply } => {
                    let _ = reply.send(self.conversation.clone());
                }
                Command::Shutdown => break,
            }
        }
        info!("session worker stopped");
    }

    async fn turn(&mut self, content: Content) -> Result<Message, ChatError> {
        self.status(STATUS_THINKING);

        // The user message is only kept if the turn succeeds.
        let mut working = self.conversation.clone();
        working.push(Message::user(content));

        let result = self.orchestrator.chat(&mut working).await;
        match &result {
            Ok(reply) => {
                self.conversation = working;
                self.notifier
                    .deliver(Notification::TurnFinished { reply: reply.text() })
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "turn failed, history unchanged");
                self.notifier
                    .deliver(Notification::TurnFailed { error: e.to_string() })
                    .await;
            }
        }

        self.status(STATUS_READY);
        result
    }

    fn status(&self, message: &str) {
        self.notifier.notify(Notification::Status {
            message: message.to_string(),
        });
    }
}
