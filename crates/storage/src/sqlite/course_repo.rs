use course_core::model::{Course, CourseId, LessonId};
use serde_json::Value;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_lesson_row, ser};
use crate::repository::{CourseRepository, CourseRecord, LessonRecord, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &CourseRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(id_to_i64("course_id", course.id.value())?)
        .bind(course.title.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &LessonRecord) -> Result<(), StorageError> {
        let payload = serde_json::to_string(&lesson.payload).map_err(ser)?;
        let result = sqlx::query(
            r"
            INSERT INTO lessons (id, course_id, title, kind, sort_order, is_free, is_hidden, created_at, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(course_id, id) DO UPDATE SET
                title = excluded.title,
                kind = excluded.kind,
                sort_order = excluded.sort_order,
                is_free = excluded.is_free,
                is_hidden = excluded.is_hidden,
                payload = excluded.payload
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id.value())?)
        .bind(id_to_i64("course_id", lesson.course_id.value())?)
        .bind(lesson.title.as_str())
        .bind(lesson.kind.tag())
        .bind(lesson.order)
        .bind(i64::from(lesson.is_free))
        .bind(i64::from(lesson.is_hidden))
        .bind(lesson.created_at)
        .bind(payload)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(StorageError::NotFound)
            }
            Err(e) => Err(conn(e)),
        }
    }

    async fn get_course(&self, id: CourseId) -> Result<Course, StorageError> {
        let course_id = id_to_i64("course_id", id.value())?;
        let row = sqlx::query("SELECT id, title FROM courses WHERE id = ?1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        let title: String = row.try_get("title").map_err(ser)?;

        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, kind, sort_order, is_free, is_hidden, created_at, '{}' AS payload
            FROM lessons
            WHERE course_id = ?1
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut lessons = Vec::with_capacity(rows.len());
        for row in &rows {
            lessons.push(map_lesson_row(row)?.outline());
        }
        Ok(Course::new(id, title, lessons))
    }

    async fn get_lesson_payload(
        &self,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<Value, StorageError> {
        let row = sqlx::query("SELECT payload FROM lessons WHERE course_id = ?1 AND id = ?2")
            .bind(id_to_i64("course_id", course.value())?)
            .bind(id_to_i64("lesson_id", lesson.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        let payload: String = row.try_get("payload").map_err(ser)?;
        serde_json::from_str(&payload).map_err(ser)
    }
}
