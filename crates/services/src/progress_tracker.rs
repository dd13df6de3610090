use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use course_core::model::{CourseId, LearnerId, LessonId, Progress};
use storage::feed::ProgressSubscription;
use storage::repository::ProgressRepository;
use tracing::{debug, warn};

use crate::Clock;
use crate::error::ProgressError;

/// Result of a local progress change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub completed: BTreeSet<LessonId>,
    /// False when the operation was a no-op (marking an already completed lesson).
    pub changed: bool,
}

struct Entry {
    progress: Progress,
    /// False when the stored record could not be read; local changes are merged into
    /// it once a read succeeds.
    loaded: bool,
    /// Holds local changes that no write has stored yet. Remote snapshots are not
    /// adopted while set.
    dirty: bool,
    /// Open sessions for the pair. The entry is evicted when the last one detaches.
    sessions: usize,
}

impl Entry {
    fn new(learner: LearnerId, course: CourseId, now: DateTime<Utc>) -> Self {
        Self {
            progress: Progress::new(learner, course, now),
            loaded: false,
            dirty: false,
            sessions: 0,
        }
    }
}

type PairKey = (LearnerId, CourseId);

/// Owns the completed-lesson set per (learner, course).
///
/// Every change is applied to the local copy first and then written through. A
/// failed write is returned to the caller but never rolls the local copy back.
pub struct ProgressTracker {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
    cache: Mutex<HashMap<PairKey, Entry>>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            repo,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Loads (or reloads) the stored set for the pair. Unsaved local changes win
    /// over the stored set.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the read fails; the local copy is kept.
    pub async fn load(
        &self,
        learner: LearnerId,
        course: CourseId,
    ) -> Result<BTreeSet<LessonId>, ProgressError> {
        let stored = self.repo.get_progress(learner, course).await?;
        let now = self.clock.now();
        let mut cache = self.lock();
        let entry = Self::entry(&mut cache, learner, course, now);
        if entry.loaded && entry.dirty {
            return Ok(entry.progress.completed().clone());
        }
        let mut completed = stored
            .as_ref()
            .map(|progress| progress.completed().clone())
            .unwrap_or_default();
        if !entry.loaded {
            completed.extend(entry.progress.completed().iter().copied());
        }
        entry.progress.replace(completed.clone(), now);
        entry.loaded = true;
        Ok(completed)
    }

    /// The locally known set for the pair. Empty if nothing is cached.
    #[must_use]
    pub fn completed(&self, learner: LearnerId, course: CourseId) -> BTreeSet<LessonId> {
        self.lock()
            .get(&(learner, course))
            .map(|entry| entry.progress.completed().clone())
            .unwrap_or_default()
    }

    /// True while the pair has local changes that are not stored yet.
    #[must_use]
    pub fn has_unsaved_changes(&self, learner: LearnerId, course: CourseId) -> bool {
        self.lock()
            .get(&(learner, course))
            .is_some_and(|entry| entry.dirty)
    }

    /// Idempotently adds `lesson` and persists the new set. Runners only ever call
    /// this; a result can never retract a completion.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when the write fails. The lesson stays
    /// marked locally.
    pub async fn mark_complete(
        &self,
        learner: LearnerId,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<ProgressUpdate, ProgressError> {
        self.ensure_loaded(learner, course).await;
        let now = self.clock.now();
        let (snapshot, changed, loaded) = {
            let mut cache = self.lock();
            let entry = Self::entry(&mut cache, learner, course, now);
            let changed = entry.progress.mark(lesson, now);
            entry.dirty |= changed;
            (entry.progress.clone(), changed, entry.loaded)
        };
        let update = ProgressUpdate {
            completed: snapshot.completed().clone(),
            changed,
        };
        if !changed {
            return Ok(update);
        }
        debug!(learner = %learner, course = %course, lesson = %lesson, "lesson marked complete");
        self.write(&snapshot, loaded).await?;
        Ok(update)
    }

    /// Adds `lesson` if absent, removes it otherwise. Used for manual marking.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when the write fails. The toggle is kept
    /// locally.
    pub async fn toggle_complete(
        &self,
        learner: LearnerId,
        course: CourseId,
        lesson: LessonId,
    ) -> Result<ProgressUpdate, ProgressError> {
        self.ensure_loaded(learner, course).await;
        let now = self.clock.now();
        let (snapshot, loaded) = {
            let mut cache = self.lock();
            let entry = Self::entry(&mut cache, learner, course, now);
            entry.progress.toggle(lesson, now);
            entry.dirty = true;
            (entry.progress.clone(), entry.loaded)
        };
        debug!(
            learner = %learner,
            course = %course,
            lesson = %lesson,
            complete = snapshot.is_complete(lesson),
            "lesson completion toggled"
        );
        self.write(&snapshot, loaded).await?;
        Ok(ProgressUpdate {
            completed: snapshot.completed().clone(),
            changed: true,
        })
    }

    /// Writes the local set again, for retrying a failed write.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` when the write fails again.
    pub async fn persist(&self, learner: LearnerId, course: CourseId) -> Result<(), ProgressError> {
        self.ensure_loaded(learner, course).await;
        let (snapshot, loaded) = {
            let mut cache = self.lock();
            let entry = Self::entry(&mut cache, learner, course, self.clock.now());
            (entry.progress.clone(), entry.loaded)
        };
        self.write(&snapshot, loaded).await
    }

    /// Adopts a snapshot written elsewhere (last write wins). Returns `false` when
    /// the snapshot was ignored: it is older than the local copy, or the local copy
    /// has changes that are not stored yet.
    pub fn apply_remote(&self, progress: &Progress) -> bool {
        let mut cache = self.lock();
        let entry = Self::entry(
            &mut cache,
            progress.learner_id(),
            progress.course_id(),
            progress.last_updated(),
        );
        if entry.dirty {
            debug!(
                learner = %progress.learner_id(),
                course = %progress.course_id(),
                "remote progress ignored over unsaved changes"
            );
            return false;
        }
        if entry.loaded && progress.last_updated() < entry.progress.last_updated() {
            return false;
        }
        entry
            .progress
            .replace(progress.completed().clone(), progress.last_updated());
        entry.loaded = true;
        true
    }

    /// Registers an open session for the pair and returns its live feed.
    #[must_use]
    pub fn attach(&self, learner: LearnerId, course: CourseId) -> ProgressSubscription {
        {
            let mut cache = self.lock();
            Self::entry(&mut cache, learner, course, self.clock.now()).sessions += 1;
        }
        self.repo.subscribe_progress(learner, course)
    }

    /// Unregisters a session. The last one out evicts the cached set, unless it
    /// still holds unsaved changes.
    pub fn detach(&self, learner: LearnerId, course: CourseId) {
        let mut cache = self.lock();
        let Some(entry) = cache.get_mut(&(learner, course)) else {
            return;
        };
        entry.sessions = entry.sessions.saturating_sub(1);
        if entry.sessions == 0 && !entry.dirty {
            cache.remove(&(learner, course));
            debug!(learner = %learner, course = %course, "progress cache evicted");
        }
    }

    async fn ensure_loaded(&self, learner: LearnerId, course: CourseId) {
        let loaded = self
            .lock()
            .get(&(learner, course))
            .is_some_and(|entry| entry.loaded);
        if loaded {
            return;
        }
        if let Err(e) = self.load(learner, course).await {
            warn!(learner = %learner, course = %course, error = %e, "progress read failed; keeping local state");
        }
    }

    async fn write(&self, snapshot: &Progress, loaded: bool) -> Result<(), ProgressError> {
        if !loaded {
            // Writing a partial set would clobber the stored record.
            return Err(ProgressError::NotLoaded);
        }
        if let Err(e) = self.repo.set_progress(snapshot).await {
            warn!(
                learner = %snapshot.learner_id(),
                course = %snapshot.course_id(),
                error = %e,
                "progress write failed; keeping local state"
            );
            return Err(e.into());
        }
        let mut cache = self.lock();
        if let Some(entry) = cache.get_mut(&(snapshot.learner_id(), snapshot.course_id())) {
            // A change made while the write was in flight keeps the entry dirty.
            if entry.progress.completed() == snapshot.completed() {
                entry.dirty = false;
            }
        }
        Ok(())
    }

    fn entry(
        cache: &mut HashMap<PairKey, Entry>,
        learner: LearnerId,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> &mut Entry {
        cache
            .entry((learner, course))
            .or_insert_with(|| Entry::new(learner, course, now))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PairKey, Entry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use course_core::model::percent;
    use course_core::time::{fixed_clock, fixed_now};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use storage::feed::ProgressFeed;
    use storage::repository::{InMemoryRepository, StorageError};

    /// Wraps the in-memory store and can be told to fail reads or writes.
    struct FlakyProgress {
        inner: InMemoryRepository,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        writes: AtomicUsize,
        feed: ProgressFeed,
    }

    impl FlakyProgress {
        fn new() -> Self {
            Self {
                inner: InMemoryRepository::new(),
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                writes: AtomicUsize::new(0),
                feed: ProgressFeed::default(),
            }
        }
    }

    #[async_trait]
    impl ProgressRepository for FlakyProgress {
        async fn get_progress(
            &self,
            learner: LearnerId,
            course: CourseId,
        ) -> Result<Option<Progress>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("offline".into()));
            }
            self.inner.get_progress(learner, course).await
        }

        async fn set_progress(&self, progress: &Progress) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("offline".into()));
            }
            self.inner.set_progress(progress).await
        }

        fn subscribe_progress(&self, learner: LearnerId, course: CourseId) -> ProgressSubscription {
            self.feed.subscribe(learner, course)
        }
    }

    const LEARNER: LearnerId = LearnerId::new(1);

    fn ids(values: &[u64]) -> BTreeSet<LessonId> {
        values.iter().copied().map(LessonId::new).collect()
    }

    #[tokio::test]
    async fn mark_is_idempotent_and_persisted() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo.clone());
        let course = CourseId::new(1);

        let first = tracker.mark_complete(LEARNER, course, LessonId::new(3)).await.unwrap();
        assert!(first.changed);
        let second = tracker.mark_complete(LEARNER, course, LessonId::new(3)).await.unwrap();
        assert!(!second.changed);
        assert_eq!(repo.writes.load(Ordering::SeqCst), 1);

        let stored = repo.inner.get_progress(LEARNER, course).await.unwrap().unwrap();
        assert_eq!(stored.completed(), &ids(&[3]));
    }

    #[tokio::test]
    async fn toggle_removes_and_restores() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo.clone());
        let course = CourseId::new(1);

        tracker.mark_complete(LEARNER, course, LessonId::new(1)).await.unwrap();
        let off = tracker.toggle_complete(LEARNER, course, LessonId::new(1)).await.unwrap();
        assert!(off.completed.is_empty());
        let on = tracker.toggle_complete(LEARNER, course, LessonId::new(1)).await.unwrap();
        assert_eq!(on.completed, ids(&[1]));
    }

    #[tokio::test]
    async fn failed_write_keeps_local_state() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo.clone());
        let course = CourseId::new(1);
        tracker.load(LEARNER, course).await.unwrap();

        repo.fail_writes.store(true, Ordering::SeqCst);
        let err = tracker
            .mark_complete(LEARNER, course, LessonId::new(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::Storage(_)));
        assert_eq!(tracker.completed(LEARNER, course), ids(&[7]));

        repo.fail_writes.store(false, Ordering::SeqCst);
        tracker.persist(LEARNER, course).await.unwrap();
        let stored = repo.inner.get_progress(LEARNER, course).await.unwrap().unwrap();
        assert_eq!(stored.completed(), &ids(&[7]));
    }

    #[tokio::test]
    async fn unreadable_store_is_not_overwritten() {
        let repo = Arc::new(FlakyProgress::new());
        let course = CourseId::new(1);
        let mut existing = Progress::new(LEARNER, course, fixed_now());
        existing.mark(LessonId::new(1), fixed_now());
        repo.inner.set_progress(&existing).await.unwrap();

        let tracker = ProgressTracker::new(fixed_clock(), repo.clone());
        repo.fail_reads.store(true, Ordering::SeqCst);
        assert!(tracker
            .mark_complete(LEARNER, course, LessonId::new(2))
            .await
            .is_err());
        assert_eq!(repo.writes.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.completed(LEARNER, course), ids(&[2]));

        repo.fail_reads.store(false, Ordering::SeqCst);
        tracker.persist(LEARNER, course).await.unwrap();
        let stored = repo.inner.get_progress(LEARNER, course).await.unwrap().unwrap();
        assert_eq!(stored.completed(), &ids(&[1, 2]));
    }

    #[tokio::test]
    async fn percent_never_decreases_under_marks() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo);
        let course = CourseId::new(1);
        let total = 4;
        let mut last = percent(0, total);
        assert_eq!(last, 0);
        for lesson in [2, 1, 2, 4, 3] {
            let update = tracker
                .mark_complete(LEARNER, course, LessonId::new(lesson))
                .await
                .unwrap();
            let now = percent(update.completed.len(), total);
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn remote_snapshot_replaces_local_set() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo);
        let course = CourseId::new(1);
        tracker.mark_complete(LEARNER, course, LessonId::new(1)).await.unwrap();

        let remote = Progress::from_persisted(LEARNER, course, ids(&[4, 5]), fixed_now());
        assert!(tracker.apply_remote(&remote));
        assert_eq!(tracker.completed(LEARNER, course), ids(&[4, 5]));
    }

    #[tokio::test]
    async fn unsaved_marks_survive_remote_snapshots() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo.clone());
        let course = CourseId::new(1);
        tracker.mark_complete(LEARNER, course, LessonId::new(1)).await.unwrap();
        let echo = repo.inner.get_progress(LEARNER, course).await.unwrap().unwrap();

        repo.fail_writes.store(true, Ordering::SeqCst);
        assert!(tracker
            .mark_complete(LEARNER, course, LessonId::new(2))
            .await
            .is_err());
        assert!(tracker.has_unsaved_changes(LEARNER, course));
        assert!(!tracker.apply_remote(&echo));
        assert_eq!(tracker.load(LEARNER, course).await.unwrap(), ids(&[1, 2]));

        repo.fail_writes.store(false, Ordering::SeqCst);
        tracker.persist(LEARNER, course).await.unwrap();
        assert!(!tracker.has_unsaved_changes(LEARNER, course));
        let stored = repo.inner.get_progress(LEARNER, course).await.unwrap().unwrap();
        assert_eq!(stored.completed(), &ids(&[1, 2]));
    }

    #[tokio::test]
    async fn older_remote_snapshot_is_ignored() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo);
        let course = CourseId::new(1);
        tracker.mark_complete(LEARNER, course, LessonId::new(1)).await.unwrap();

        let stale = Progress::from_persisted(
            LEARNER,
            course,
            BTreeSet::new(),
            fixed_now() - chrono::Duration::minutes(5),
        );
        assert!(!tracker.apply_remote(&stale));
        assert_eq!(tracker.completed(LEARNER, course), ids(&[1]));
    }

    #[tokio::test]
    async fn last_detach_evicts_clean_entries() {
        let repo = Arc::new(FlakyProgress::new());
        let tracker = ProgressTracker::new(fixed_clock(), repo.clone());
        let course = CourseId::new(1);

        let _first = tracker.attach(LEARNER, course);
        let _second = tracker.attach(LEARNER, course);
        tracker.mark_complete(LEARNER, course, LessonId::new(1)).await.unwrap();
        tracker.detach(LEARNER, course);
        assert_eq!(tracker.completed(LEARNER, course), ids(&[1]));
        tracker.detach(LEARNER, course);
        assert!(tracker.completed(LEARNER, course).is_empty());
        assert!(tracker.lock().is_empty());

        // Unsaved changes outlive the last session.
        let _third = tracker.attach(LEARNER, course);
        repo.fail_writes.store(true, Ordering::SeqCst);
        assert!(tracker
            .mark_complete(LEARNER, course, LessonId::new(2))
            .await
            .is_err());
        tracker.detach(LEARNER, course);
        assert_eq!(tracker.completed(LEARNER, course), ids(&[1, 2]));
    }
}
