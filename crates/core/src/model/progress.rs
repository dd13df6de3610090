use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::model::ids::{CourseId, LearnerId, LessonId};

/// Rounded completion percentage: `round(100 * completed / max(1, total))`.
///
/// Halves round up. The result is not capped; callers that may count stale ids
/// should filter first (see `LessonCatalog::percent_complete`).
#[must_use]
pub fn percent(completed: usize, total_lessons: usize) -> u32 {
    let total = total_lessons.max(1) as u128;
    let scaled = (200 * completed as u128 + total) / (2 * total);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Durable record of the lessons a learner has completed in one course.
///
/// Created lazily on the first completion and never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    learner_id: LearnerId,
    course_id: CourseId,
    completed: BTreeSet<LessonId>,
    last_updated: DateTime<Utc>,
}

impl Progress {
    #[must_use]
    pub fn new(learner_id: LearnerId, course_id: CourseId, at: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            course_id,
            completed: BTreeSet::new(),
            last_updated: at,
        }
    }

    /// Rehydrate progress from persisted storage.
    #[must_use]
    pub fn from_persisted(
        learner_id: LearnerId,
        course_id: CourseId,
        completed: BTreeSet<LessonId>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            learner_id,
            course_id,
            completed,
            last_updated,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<LessonId> {
        &self.completed
    }

    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    #[must_use]
    pub fn is_complete(&self, lesson: LessonId) -> bool {
        self.completed.contains(&lesson)
    }

    /// Adds `lesson` to the completed set. Returns `false` if it was already there,
    /// in which case nothing changes.
    pub fn mark(&mut self, lesson: LessonId, at: DateTime<Utc>) -> bool {
        let inserted = self.completed.insert(lesson);
        if inserted {
            self.last_updated = at;
        }
        inserted
    }

    /// Flips membership of `lesson`. Returns whether it is complete afterwards.
    pub fn toggle(&mut self, lesson: LessonId, at: DateTime<Utc>) -> bool {
        let now_complete = if self.completed.remove(&lesson) {
            false
        } else {
            self.completed.insert(lesson)
        };
        self.last_updated = at;
        now_complete
    }

    /// Replaces the whole set with a remote snapshot (last write wins).
    pub fn replace(&mut self, completed: BTreeSet<LessonId>, at: DateTime<Utc>) {
        self.completed = completed;
        self.last_updated = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn progress() -> Progress {
        Progress::new(LearnerId::new(1), CourseId::new(1), fixed_now())
    }

    #[test]
    fn percent_bounds() {
        assert_eq!(percent(0, 7), 0);
        assert_eq!(percent(7, 7), 100);
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
    }

    #[test]
    fn percent_is_monotonic_under_marking() {
        let mut p = progress();
        let mut last = 0;
        for id in 1..=9 {
            p.mark(LessonId::new(id), fixed_now());
            let now = percent(p.completed().len(), 9);
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn mark_is_idempotent() {
        let mut p = progress();
        assert!(p.mark(LessonId::new(3), fixed_now()));
        assert!(!p.mark(LessonId::new(3), fixed_now()));
        assert_eq!(p.completed().len(), 1);
    }

    #[test]
    fn toggle_inserts_then_removes() {
        let mut p = progress();
        assert!(p.toggle(LessonId::new(3), fixed_now()));
        assert!(!p.toggle(LessonId::new(3), fixed_now()));
        assert!(p.completed().is_empty());
    }
}
