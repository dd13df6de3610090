use chrono::{DateTime, Utc};
use course_core::model::{CourseId, Enrollment, LearnerId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_enrollment_row, ser};
use crate::repository::{EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn get_enrollment(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT learner_id, course_id, status, access_type, expiry
            FROM enrollments
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("learner_id", learner.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO enrollments (learner_id, course_id, status, access_type, expiry)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(learner_id, course_id) DO UPDATE SET
                status = excluded.status,
                access_type = excluded.access_type,
                expiry = excluded.expiry
            ",
        )
        .bind(id_to_i64("learner_id", enrollment.learner_id.value())?)
        .bind(id_to_i64("course_id", enrollment.course_id.value())?)
        .bind(enrollment.status.as_str())
        .bind(enrollment.access_type.as_str())
        .bind(enrollment.expiry)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn touch_last_accessed(
        &self,
        learner: LearnerId,
        course: CourseId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r"
            UPDATE enrollments SET last_accessed_at = ?3
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("learner_id", learner.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn last_accessed(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT last_accessed_at FROM enrollments
            WHERE learner_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("learner_id", learner.value())?)
        .bind(id_to_i64("course_id", course.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => row.try_get("last_accessed_at").map_err(ser),
            None => Ok(None),
        }
    }
}
