use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, Enrollment, LearnerId, Lesson, LessonId, LessonKind, Progress,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::feed::{ProgressFeed, ProgressSubscription};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted course header. Lessons are stored separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRecord {
    pub id: CourseId,
    pub title: String,
}

/// Persisted shape for a lesson: the catalog outline plus its raw payload.
///
/// The payload stays as raw JSON so malformed content is stored as authored and
/// only rejected when a player tries to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonRecord {
    pub id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    pub kind: LessonKind,
    pub order: Option<i64>,
    pub is_free: bool,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub payload: Value,
}

impl LessonRecord {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson, payload: Value) -> Self {
        Self {
            id: lesson.id(),
            course_id: lesson.course_id(),
            title: lesson.title().to_owned(),
            kind: lesson.kind().clone(),
            order: lesson.order(),
            is_free: lesson.is_free(),
            is_hidden: lesson.is_hidden(),
            created_at: lesson.created_at(),
            payload,
        }
    }

    /// The catalog entry for this lesson, without its payload.
    #[must_use]
    pub fn outline(&self) -> Lesson {
        Lesson::new(
            self.id,
            self.course_id,
            self.title.clone(),
            self.kind.clone(),
            self.order,
            self.created_at,
        )
        .with_free(self.is_free)
        .with_hidden(self.is_hidden)
    }
}

/// Repository contract for course outlines and lesson payloads.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course header.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &CourseRecord) -> Result<(), StorageError>;

    /// Persist or update a lesson and its payload.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist, or other
    /// storage errors.
    async fn upsert_lesson(&self, lesson: &LessonRecord) -> Result<(), StorageError>;

    /// Fetch a course and its lesson outlines. Payloads are never included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError>;

    /// Fetch the raw payload of a single lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson is not part of the course.
    async fn get_lesson_payload(
        &self,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<Value, StorageError>;
}

/// Repository contract for durable completed-lesson sets.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch progress for a learner in a course. `None` until the first write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_progress(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<Progress>, StorageError>;

    /// Replace the whole completed set (last write wins) and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn set_progress(&self, progress: &Progress) -> Result<(), StorageError>;

    /// Open a live feed of writes for the pair.
    fn subscribe_progress(&self, learner: LearnerId, course: CourseId) -> ProgressSubscription;
}

/// Repository contract for enrollments, written by billing and read by the player.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_enrollment(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the enrollment cannot be stored.
    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// Stamp the time a learner last opened the course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when there is no enrollment to stamp.
    async fn touch_last_accessed(
        &self,
        learner: LearnerId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn last_accessed(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<DateTime<Utc>>, StorageError>;
}

type PairKey = (LearnerId, CourseId);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, CourseRecord>>>,
    lessons: Arc<Mutex<HashMap<(CourseId, LessonId), LessonRecord>>>,
    progress: Arc<Mutex<HashMap<PairKey, Progress>>>,
    enrollments: Arc<Mutex<HashMap<PairKey, Enrollment>>>,
    last_accessed: Arc<Mutex<HashMap<PairKey, DateTime<Utc>>>>,
    feed: ProgressFeed,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn feed(&self) -> &ProgressFeed {
        &self.feed
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &CourseRecord) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id, course.clone());
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &LessonRecord) -> Result<(), StorageError> {
        if !self.courses.lock().map_err(poisoned)?.contains_key(&lesson.course_id) {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        guard.insert((lesson.course_id, lesson.id), lesson.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let record = self
            .courses
            .lock()
            .map_err(poisoned)?
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)?;
        let lessons = self
            .lessons
            .lock()
            .map_err(poisoned)?
            .values()
            .filter(|lesson| lesson.course_id == id)
            .map(LessonRecord::outline)
            .collect();
        Ok(Course::new(record.id, record.title, lessons))
    }

    async fn get_lesson_payload(
        &self,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<Value, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        guard
            .get(&(course, lesson))
            .map(|record| record.payload.clone())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<Progress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(learner, course)).cloned())
    }

    async fn set_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        {
            let mut guard = self.progress.lock().map_err(poisoned)?;
            guard.insert(
                (progress.learner_id(), progress.course_id()),
                progress.clone(),
            );
        }
        self.feed.publish(progress);
        Ok(())
    }

    fn subscribe_progress(&self, learner: LearnerId, course: CourseId) -> ProgressSubscription {
        self.feed.subscribe(learner, course)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn get_enrollment(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self.enrollments.lock().map_err(poisoned)?;
        Ok(guard.get(&(learner, course)).cloned())
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        guard.insert(
            (enrollment.learner_id, enrollment.course_id),
            enrollment.clone(),
        );
        Ok(())
    }

    async fn touch_last_accessed(
        &self,
        learner: LearnerId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if !self
            .enrollments
            .lock()
            .map_err(poisoned)?
            .contains_key(&(learner, course))
        {
            return Err(StorageError::NotFound);
        }
        let mut guard = self.last_accessed.lock().map_err(poisoned)?;
        guard.insert((learner, course), at);
        Ok(())
    }

    async fn last_accessed(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let guard = self.last_accessed.lock().map_err(poisoned)?;
        Ok(guard.get(&(learner, course)).copied())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            courses,
            progress,
            enrollments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::time::fixed_now;
    use serde_json::json;

    fn lesson(id: u64, order: i64, kind: LessonKind) -> LessonRecord {
        LessonRecord {
            id: LessonId::new(id),
            course_id: CourseId::new(1),
            title: format!("Lesson {id}"),
            kind,
            order: Some(order),
            is_free: false,
            is_hidden: false,
            created_at: fixed_now(),
            payload: json!({ "videoId": format!("v{id}") }),
        }
    }

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.upsert_course(&CourseRecord {
            id: CourseId::new(1),
            title: "Rust".into(),
        })
        .await
        .unwrap();
        repo.upsert_lesson(&lesson(2, 2, LessonKind::Video)).await.unwrap();
        repo.upsert_lesson(&lesson(1, 1, LessonKind::Header)).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn course_outline_is_sorted_and_payload_free() {
        let repo = seeded().await;
        let course = repo.get_course(CourseId::new(1)).await.unwrap();
        assert_eq!(course.title(), "Rust");
        assert_eq!(course.lesson_ids(), vec![LessonId::new(1), LessonId::new(2)]);

        let payload = repo
            .get_lesson_payload(CourseId::new(1), LessonId::new(2))
            .await
            .unwrap();
        assert_eq!(payload, json!({ "videoId": "v2" }));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let repo = seeded().await;
        assert!(matches!(
            repo.get_course(CourseId::new(9)).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.get_lesson_payload(CourseId::new(1), LessonId::new(9)).await,
            Err(StorageError::NotFound)
        ));
        let mut orphan = lesson(3, 3, LessonKind::Text);
        orphan.course_id = CourseId::new(9);
        assert!(matches!(
            repo.upsert_lesson(&orphan).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn set_progress_publishes_to_subscribers() {
        let repo = InMemoryRepository::new();
        let mut sub = repo.subscribe_progress(LearnerId::new(5), CourseId::new(1));

        let mut progress = Progress::new(LearnerId::new(5), CourseId::new(1), fixed_now());
        progress.mark(LessonId::new(2), fixed_now());
        repo.set_progress(&progress).await.unwrap();

        assert_eq!(sub.changed().await, Some(progress.clone()));
        assert_eq!(
            repo.get_progress(LearnerId::new(5), CourseId::new(1)).await.unwrap(),
            Some(progress)
        );
    }

    #[tokio::test]
    async fn touch_requires_an_enrollment() {
        let repo = InMemoryRepository::new();
        let (learner, course) = (LearnerId::new(5), CourseId::new(1));
        assert!(matches!(
            repo.touch_last_accessed(learner, course, fixed_now()).await,
            Err(StorageError::NotFound)
        ));

        repo.upsert_enrollment(&Enrollment::approved_lifetime(learner, course))
            .await
            .unwrap();
        repo.touch_last_accessed(learner, course, fixed_now()).await.unwrap();
        assert_eq!(
            repo.last_accessed(learner, course).await.unwrap(),
            Some(fixed_now())
        );
    }
}
