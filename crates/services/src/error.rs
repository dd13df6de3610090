//! Shared error types for the services crate.

use thiserror::Error;

use course_core::{CatalogError, LockReason};
use course_core::model::{LessonId, PayloadError};
use course_core::runner::RunnerError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressTracker`.
///
/// A write failure is reported after the change has already been applied to the
/// tracker's local state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("anonymous viewers have no progress record")]
    Anonymous,
    #[error("stored progress could not be read; write skipped")]
    NotLoaded,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `GatedContent`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("lesson is locked: {0:?}")]
    Locked(LockReason),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("lesson {0} is not visible in this course")]
    UnknownLesson(LessonId),
    #[error("lesson {0} cannot be marked complete")]
    NotLearnable(LessonId),
    #[error("no lesson is active")]
    NoActiveLesson,
    #[error("active lesson is not a {expected}")]
    WrongView { expected: &'static str },
    #[error("lesson is locked: {0:?}")]
    Locked(LockReason),
    #[error("no exam completion is waiting to be retried")]
    NothingToRetry,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("invalid sqlite url: {0}")]
    InvalidDbUrl(String),
    #[error("could not prepare database file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors emitted while bootstrapping player services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
