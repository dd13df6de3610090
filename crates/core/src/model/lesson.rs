use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

use crate::model::ids::{CourseId, LessonId};

//
// ─── LESSON KIND ───────────────────────────────────────────────────────────────
//

/// Discriminant for the kind of content a lesson carries.
///
/// Persisted as a lowercase tag. Tags that this build does not understand are kept
/// as `Unsupported` so the player can show a placeholder instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LessonKind {
    Video,
    /// Section divider with no payload.
    Header,
    Quiz,
    Text,
    Exercise,
    Exam,
    Flashcard,
    Html,
    Unsupported(String),
}

impl LessonKind {
    /// Parses a persisted kind tag. Never fails.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "video" => Self::Video,
            "header" => Self::Header,
            "quiz" => Self::Quiz,
            "text" => Self::Text,
            "exercise" => Self::Exercise,
            "exam" => Self::Exam,
            "flashcard" => Self::Flashcard,
            "html" => Self::Html,
            _ => Self::Unsupported(tag.to_owned()),
        }
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Video => "video",
            Self::Header => "header",
            Self::Quiz => "quiz",
            Self::Text => "text",
            Self::Exercise => "exercise",
            Self::Exam => "exam",
            Self::Flashcard => "flashcard",
            Self::Html => "html",
            Self::Unsupported(tag) => tag.as_str(),
        }
    }

    #[must_use]
    pub fn is_header(&self) -> bool {
        matches!(self, Self::Header)
    }
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Catalog entry for a lesson. Carries no payload; payloads are loaded one lesson
/// at a time once access has been granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    order: Option<i64>,
    kind: LessonKind,
    is_free: bool,
    is_hidden: bool,
    created_at: DateTime<Utc>,
}

impl Lesson {
    #[must_use]
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        kind: LessonKind,
        order: Option<i64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            course_id,
            title: title.into(),
            order,
            kind,
            is_free: false,
            is_hidden: false,
            created_at,
        }
    }

    /// Marks the lesson as a free preview that bypasses enrollment gating.
    #[must_use]
    pub fn with_free(mut self, is_free: bool) -> Self {
        self.is_free = is_free;
        self
    }

    /// Hides the lesson from non-admin catalogs.
    #[must_use]
    pub fn with_hidden(mut self, is_hidden: bool) -> Self {
        self.is_hidden = is_hidden;
        self
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order(&self) -> Option<i64> {
        self.order
    }

    #[must_use]
    pub fn kind(&self) -> &LessonKind {
        &self.kind
    }

    #[must_use]
    pub fn is_header(&self) -> bool {
        self.kind.is_header()
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.is_free
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Sequence ordering: explicit `order` first (unordered lessons last), then creation time.
    #[must_use]
    pub fn sequence_cmp(&self, other: &Self) -> Ordering {
        let left = self.order.unwrap_or(i64::MAX);
        let right = other.order.unwrap_or(i64::MAX);
        left.cmp(&right)
            .then_with(|| self.created_at.cmp(&other.created_at))
    }
}

/// Sorts lessons into course sequence. The sort is stable.
pub fn sort_lessons(lessons: &mut [Lesson]) {
    lessons.sort_by(Lesson::sequence_cmp);
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course outline: title plus its lessons in sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    lessons: Vec<Lesson>,
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, title: impl Into<String>, mut lessons: Vec<Lesson>) -> Self {
        sort_lessons(&mut lessons);
        Self {
            id,
            title: title.into(),
            lessons,
        }
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn lesson_ids(&self) -> Vec<LessonId> {
        self.lessons.iter().map(Lesson::id).collect()
    }

    #[must_use]
    pub fn into_lessons(self) -> Vec<Lesson> {
        self.lessons
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
