#![forbid(unsafe_code)]

pub mod feed;
pub mod repository;
pub mod sqlite;

pub use feed::{ProgressFeed, ProgressSubscription};
pub use repository::{
    CourseRecord, CourseRepository, EnrollmentRepository, InMemoryRepository, LessonRecord,
    ProgressRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
