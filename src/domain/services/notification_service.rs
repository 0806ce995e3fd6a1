//! Persisted in-app notifications plus live fan-out to connected clients.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::domain::{models::notification::Notification, ports::NotificationRepository};
use crate::error::AppError;

/// Buffer capacity of the live channel; slow subscribers lag past this.
const CHANNEL_CAPACITY: usize = 256;

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    sender: broadcast::Sender<Notification>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { repo, sender }
    }

    /// Stores the notification, then publishes it to live subscribers.
    pub async fn notify(&self, notification: Notification) -> Result<Notification, AppError> {
        let stored = self.repo.create(&notification).await?;
        // A send error only means nobody is listening right now.
        if self.sender.send(stored.clone()).is_err() {
            debug!("No live subscribers for notification {}", stored.id);
        }
        Ok(stored)
    }

    /// Like [`notify`](Self::notify) but never fails the caller; for side effects of
    /// requests whose primary write already succeeded.
    pub async fn notify_quietly(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if let Err(e) = self.notify(notification).await {
                error!("Failed to store notification: {:?}", e);
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}
