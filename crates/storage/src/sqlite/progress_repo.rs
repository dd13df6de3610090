use course_core::model::{CourseId, LearnerId, Progress};

use super::SqliteRepository;
use super::mapping::{completed_to_json, conn, id_to_i64, map_progress_row};
use crate::feed::ProgressSubscription;
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<Progress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, course_id, completed, last_updated
            FROM progress
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("learner_id", learner.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn set_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (learner_id, course_id, completed, last_updated)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(learner_id, course_id) DO UPDATE SET
                completed = excluded.completed,
                last_updated = excluded.last_updated
            ",
        )
        .bind(id_to_i64("learner_id", progress.learner_id().value())?)
        .bind(id_to_i64("course_id", progress.course_id().value())?)
        .bind(completed_to_json(progress.completed())?)
        .bind(progress.last_updated())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        self.feed.publish(progress);
        Ok(())
    }

    fn subscribe_progress(&self, learner: LearnerId, course: CourseId) -> ProgressSubscription {
        self.feed.subscribe(learner, course)
    }
}
