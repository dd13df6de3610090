//! In-process live progress feed.
//!
//! Every write to a (learner, course) progress record is broadcast to all open
//! subscriptions for that pair. Dropping a subscription unsubscribes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use course_core::model::{CourseId, LearnerId, Progress};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

const DEFAULT_CAPACITY: usize = 16;

type FeedKey = (LearnerId, CourseId);

#[derive(Clone)]
pub struct ProgressFeed {
    channels: Arc<Mutex<HashMap<FeedKey, broadcast::Sender<Progress>>>>,
    capacity: usize,
}

impl Default for ProgressFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn subscribe(&self, learner: LearnerId, course: CourseId) -> ProgressSubscription {
        let mut guard = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut guard);
        let sender = guard
            .entry((learner, course))
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        ProgressSubscription {
            learner,
            course,
            receiver: sender.subscribe(),
        }
    }

    /// Sends `progress` to every live subscriber of its pair. Returns how many
    /// subscribers received it.
    pub fn publish(&self, progress: &Progress) -> usize {
        let key = (progress.learner_id(), progress.course_id());
        let mut guard = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut guard);
        let Some(sender) = guard.get(&key) else {
            debug!(learner = %key.0, course = %key.1, "progress feed has no subscribers");
            return 0;
        };
        sender.send(progress.clone()).unwrap_or(0)
    }

    #[must_use]
    pub fn subscriber_count(&self, learner: LearnerId, course: CourseId) -> usize {
        let guard = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(&(learner, course))
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

/// Drops channels whose subscriptions are all gone.
fn prune(channels: &mut HashMap<FeedKey, broadcast::Sender<Progress>>) {
    channels.retain(|_, sender| sender.receiver_count() > 0);
}

/// A live view of one learner's progress in one course.
#[derive(Debug)]
pub struct ProgressSubscription {
    learner: LearnerId,
    course: CourseId,
    receiver: broadcast::Receiver<Progress>,
}

impl ProgressSubscription {
    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course
    }

    /// Waits for the next published snapshot. A lagging subscriber skips straight
    /// to the oldest snapshot still buffered. Returns `None` once the feed is gone.
    pub async fn changed(&mut self) -> Option<Progress> {
        loop {
            match self.receiver.recv().await {
                Ok(progress) => return Some(progress),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "progress subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Drains everything buffered without waiting and returns the newest snapshot.
    pub fn try_latest(&mut self) -> Option<Progress> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(progress) => latest = Some(progress),
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
            }
        }
    }
}
