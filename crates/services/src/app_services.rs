use std::sync::Arc;

use course_core::model::{CourseId, Learner, LessonId};
use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::config::{PlayerConfig, db_url_from_lookup, prepare_sqlite_file};
use crate::error::{ServicesError, SessionError};
use crate::progress_tracker::ProgressTracker;
use crate::sessions::{SessionController, SessionDeps};

/// Assembles the player's services over one storage backend.
#[derive(Clone)]
pub struct PlayerServices {
    storage: Storage,
    deps: SessionDeps,
}

impl PlayerServices {
    /// Build services over `storage`.
    #[must_use]
    pub fn new(storage: Storage, clock: Clock, config: PlayerConfig) -> Self {
        let tracker = Arc::new(ProgressTracker::new(
            clock.clone(),
            Arc::clone(&storage.progress),
        ));
        let deps = SessionDeps::new(
            clock,
            config,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            tracker,
        );
        Self { storage, deps }
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, config: PlayerConfig) -> Self {
        Self::new(Storage::in_memory(), clock, config)
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `ServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: PlayerConfig,
    ) -> Result<Self, ServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(storage, clock, config))
    }

    /// Build `SQLite`-backed services configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ServicesError` for invalid configuration values or when the
    /// database cannot be prepared.
    pub async fn from_env() -> Result<Self, ServicesError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let config = PlayerConfig::from_lookup(lookup)?;
        let db_url = db_url_from_lookup(lookup);
        prepare_sqlite_file(&db_url)?;
        info!(%db_url, "opening player database");
        Self::new_sqlite(&db_url, Clock::default(), config).await
    }

    /// Opens a course for `viewer` (`None` for anonymous visitors).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the course cannot be loaded.
    pub async fn open_session(
        &self,
        viewer: Option<Learner>,
        course_id: CourseId,
        start: Option<LessonId>,
    ) -> Result<SessionController, SessionError> {
        SessionController::open(self.deps.clone(), viewer, course_id, start).await
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(self.deps.tracker())
    }
}
