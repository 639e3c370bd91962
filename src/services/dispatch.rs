// src/services/dispatch.rs
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::{message::InboundEvent, services::chatbot::ConversationController};

/// How long a chat worker waits for the next event before shutting down.
pub const DEFAULT_WORKER_IDLE: Duration = Duration::from_secs(300);

type Workers = HashMap<i64, UnboundedSender<InboundEvent>>;

/// Feeds events to the controller one chat at a time, in the order they were
/// pushed. Each active chat gets its own worker task; different chats run
/// concurrently.
#[derive(Clone)]
pub struct ChatQueue {
    controller: Arc<ConversationController>,
    workers: Arc<Mutex<Workers>>,
    idle: Duration,
}

impl ChatQueue {
    pub fn new(controller: Arc<ConversationController>, idle: Duration) -> Self {
        Self {
            controller,
            workers: Arc::new(Mutex::new(HashMap::new())),
            idle,
        }
    }

    pub fn controller(&self) -> &Arc<ConversationController> {
        &self.controller
    }

    /// Number of chats with a running worker.
    pub fn active_chats(&self) -> usize {
        self.lock().len()
    }

    /// Queue `event` behind anything already pending for its chat.
    pub fn push(&self, event: InboundEvent) {
        let chat_id = event.chat_id();
        let mut workers = self.lock();
        let event = match workers.get(&chat_id) {
            Some(sender) => match sender.send(event) {
                Ok(()) => return,
                Err(closed) => closed.0,
            },
            None => event,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        workers.insert(chat_id, sender);
        drop(workers);
        tokio::spawn(self.clone().run_worker(chat_id, event, receiver));
    }

    fn lock(&self) -> MutexGuard<'_, Workers> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_worker(self, chat_id: i64, first: InboundEvent, mut receiver: UnboundedReceiver<InboundEvent>) {
        self.controller.handle_event(first).await;
        loop {
            let event = match tokio::time::timeout(self.idle, receiver.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => return,
                Err(_) => {
                    // Deregister under the lock so `push` cannot hand us an
                    // event after the last check.
                    let mut workers = self.lock();
                    match receiver.try_recv() {
                        Ok(event) => event,
                        Err(_) => {
                            workers.remove(&chat_id);
                            debug!(chat_id, "chat worker idle, stopping");
                            return;
                        }
                    }
                }
            };
            self.controller.handle_event(event).await;
        }
    }
}
