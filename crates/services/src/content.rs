use std::sync::Arc;

use course_core::model::{Lesson, LessonPayload};
use course_core::{AccessContext, AccessDecision, AccessPolicy};
use storage::repository::CourseRepository;
use tracing::{debug, warn};

use crate::error::ContentError;

/// Loads lesson payloads, but only for lessons the viewer may open.
///
/// This is the single path from the player to `get_lesson_payload`; a locked
/// lesson's payload is never read.
#[derive(Clone)]
pub struct GatedContent {
    courses: Arc<dyn CourseRepository>,
}

impl GatedContent {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>) -> Self {
        Self { courses }
    }

    /// # Errors
    ///
    /// Returns `ContentError::Locked` without touching storage when access is
    /// denied, `ContentError::Storage` when the payload cannot be read, and
    /// `ContentError::Payload` when it does not match the lesson's kind.
    pub async fn load(
        &self,
        lesson: &Lesson,
        ctx: &AccessContext,
    ) -> Result<LessonPayload, ContentError> {
        if let AccessDecision::Locked(reason) = AccessPolicy::decide(lesson, ctx) {
            warn!(lesson = %lesson.id(), ?reason, "refused to load locked lesson payload");
            return Err(ContentError::Locked(reason));
        }
        if lesson.is_header() {
            return Ok(LessonPayload::Header);
        }

        let raw = self
            .courses
            .get_lesson_payload(lesson.course_id(), lesson.id())
            .await?;
        let payload = LessonPayload::parse(lesson.kind(), &raw).inspect_err(|e| {
            debug!(lesson = %lesson.id(), kind = %lesson.kind(), error = %e, "malformed lesson payload");
        })?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use course_core::LockReason;
    use course_core::model::{Course, CourseId, LessonId, LessonKind, PayloadError};
    use course_core::time::fixed_now;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::repository::{CourseRecord, LessonRecord, StorageError};

    /// Counts payload reads so tests can prove locked lessons are never fetched.
    struct CountingCourses {
        payload: Value,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl CourseRepository for CountingCourses {
        async fn upsert_course(&self, _course: &CourseRecord) -> Result<(), StorageError> {
            Ok(())
        }

        async fn upsert_lesson(&self, _lesson: &LessonRecord) -> Result<(), StorageError> {
            Ok(())
        }

        async fn get_course(&self, _id: CourseId) -> Result<Course, StorageError> {
            Err(StorageError::NotFound)
        }

        async fn get_lesson_payload(
            &self,
            _course: CourseId,
            _lesson: LessonId,
        ) -> Result<Value, StorageError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    fn setup(payload: Value) -> (Arc<CountingCourses>, GatedContent) {
        let repo = Arc::new(CountingCourses {
            payload,
            reads: AtomicUsize::new(0),
        });
        let content = GatedContent::new(repo.clone());
        (repo, content)
    }

    fn lesson(kind: LessonKind) -> Lesson {
        Lesson::new(LessonId::new(1), CourseId::new(1), "L", kind, Some(1), fixed_now())
    }

    fn anonymous() -> AccessContext {
        AccessContext::for_viewer(None, None, fixed_now())
    }

    #[tokio::test]
    async fn locked_payload_is_never_read() {
        let (repo, content) = setup(json!({"videoId": "secret"}));
        let err = content
            .load(&lesson(LessonKind::Video), &anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Locked(LockReason::SignInRequired)));
        assert_eq!(repo.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn free_lesson_is_loaded_and_parsed() {
        let (repo, content) = setup(json!({"videoId": "intro"}));
        let payload = content
            .load(&lesson(LessonKind::Video).with_free(true), &anonymous())
            .await
            .unwrap();
        assert_eq!(payload, LessonPayload::Video { video_id: "intro".into() });
        assert_eq!(repo.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_reported() {
        let (_repo, content) = setup(json!({"questions": []}));
        let err = content
            .load(&lesson(LessonKind::Exam).with_free(true), &anonymous())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::Payload(PayloadError::Empty { kind: "exam" })
        ));
    }
}
