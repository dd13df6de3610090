//! Sectioned, ordered view over a course's lessons.
//!
//! A `header` lesson opens a section that runs up to (not including) the next
//! header. Lessons that appear before the first header have no owning section and
//! are kept in a separate leading group (`orphans`).

use std::collections::BTreeSet;

use thiserror::Error;

use crate::model::{Course, Lesson, LessonId, LessonKind, percent, sort_lessons};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("lesson {0} is not in this catalog")]
    UnknownLesson(LessonId),
}

/// A header lesson and the lessons it introduces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    header: Lesson,
    items: Vec<Lesson>,
}

impl Section {
    #[must_use]
    pub fn header(&self) -> &Lesson {
        &self.header
    }

    #[must_use]
    pub fn items(&self) -> &[Lesson] {
        &self.items
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
    orphans: Vec<Lesson>,
    sections: Vec<Section>,
    assessments: Vec<Lesson>,
}

impl LessonCatalog {
    /// Groups lessons into sections. Deterministic: the same lessons always yield
    /// the same grouping.
    #[must_use]
    pub fn build(lessons: &[Lesson]) -> Self {
        let mut ordered = lessons.to_vec();
        sort_lessons(&mut ordered);

        let mut orphans = Vec::new();
        let mut sections: Vec<Section> = Vec::new();
        for lesson in &ordered {
            if lesson.is_header() {
                sections.push(Section {
                    header: lesson.clone(),
                    items: Vec::new(),
                });
                continue;
            }
            match sections.last_mut() {
                Some(section) => section.items.push(lesson.clone()),
                None => orphans.push(lesson.clone()),
            }
        }

        let assessments = ordered
            .iter()
            .filter(|lesson| matches!(lesson.kind(), LessonKind::Exam))
            .cloned()
            .collect();

        Self {
            lessons: ordered,
            orphans,
            sections,
            assessments,
        }
    }

    /// Builds the catalog a viewer is allowed to see: hidden lessons are only
    /// listed for admins.
    #[must_use]
    pub fn for_viewer(course: &Course, is_admin: bool) -> Self {
        let visible: Vec<Lesson> = course
            .lessons()
            .iter()
            .filter(|lesson| is_admin || !lesson.is_hidden())
            .cloned()
            .collect();
        Self::build(&visible)
    }

    /// All lessons in sequence, headers included.
    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Lessons that precede the first header.
    #[must_use]
    pub fn orphans(&self) -> &[Lesson] {
        &self.orphans
    }

    /// Every exam lesson in sequence, regardless of section.
    #[must_use]
    pub fn assessments(&self) -> &[Lesson] {
        &self.assessments
    }

    #[must_use]
    pub fn get(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id() == id)
    }

    #[must_use]
    pub fn position(&self, id: LessonId) -> Option<usize> {
        self.lessons.iter().position(|lesson| lesson.id() == id)
    }

    /// The section that owns `id`, or `None` for headers' own ids and orphans.
    #[must_use]
    pub fn section_of(&self, id: LessonId) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.items.iter().any(|lesson| lesson.id() == id))
    }

    #[must_use]
    pub fn first_learnable(&self) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| !lesson.is_header())
    }

    /// The next non-header lesson after `id`, crossing section boundaries.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownLesson` if `id` is not in the catalog.
    pub fn next_learnable_after(&self, id: LessonId) -> Result<Option<&Lesson>, CatalogError> {
        let position = self.position(id).ok_or(CatalogError::UnknownLesson(id))?;
        Ok(self.lessons[position + 1..]
            .iter()
            .find(|lesson| !lesson.is_header()))
    }

    /// Number of non-header lessons.
    #[must_use]
    pub fn learnable_count(&self) -> usize {
        self.lessons.iter().filter(|lesson| !lesson.is_header()).count()
    }

    /// Course completion, counting only ids that are learnable lessons in this
    /// catalog. Capped at 100.
    #[must_use]
    pub fn percent_complete(&self, completed: &BTreeSet<LessonId>) -> u32 {
        let total = self.learnable_count();
        if total == 0 {
            return 0;
        }
        let done = self
            .lessons
            .iter()
            .filter(|lesson| !lesson.is_header() && completed.contains(&lesson.id()))
            .count();
        percent(done, total).min(100)
    }
}
