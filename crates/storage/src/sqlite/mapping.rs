use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use course_core::model::{
    AccessType, CourseId, Enrollment, EnrollmentStatus, LearnerId, LessonId, LessonKind, Progress,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{LessonRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn learner_id_from_i64(v: i64) -> Result<LearnerId, StorageError> {
    Ok(LearnerId::new(i64_to_u64("learner_id", v)?))
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<LessonRecord, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    let payload: String = row.try_get("payload").map_err(ser)?;
    Ok(LessonRecord {
        id: lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        kind: LessonKind::from_tag(&kind),
        order: row.try_get("sort_order").map_err(ser)?,
        is_free: row.try_get::<i64, _>("is_free").map_err(ser)? != 0,
        is_hidden: row.try_get::<i64, _>("is_hidden").map_err(ser)? != 0,
        created_at: row.try_get("created_at").map_err(ser)?,
        payload: serde_json::from_str(&payload).map_err(ser)?,
    })
}

/// The completed set is stored as a JSON array of lesson ids.
pub(crate) fn completed_to_json(completed: &BTreeSet<LessonId>) -> Result<String, StorageError> {
    serde_json::to_string(completed).map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    let completed: String = row.try_get("completed").map_err(ser)?;
    let completed: BTreeSet<LessonId> = serde_json::from_str(&completed).map_err(ser)?;
    let last_updated: DateTime<Utc> = row.try_get("last_updated").map_err(ser)?;
    Ok(Progress::from_persisted(
        learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        completed,
        last_updated,
    ))
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    let access_type: String = row.try_get("access_type").map_err(ser)?;
    Ok(Enrollment::new(
        learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        EnrollmentStatus::parse(&status).map_err(ser)?,
        AccessType::parse(&access_type).map_err(ser)?,
        row.try_get("expiry").map_err(ser)?,
    ))
}
