use course_core::LockReason;
use course_core::model::{Lesson, LessonId, LessonPayload, TextBody};
use course_core::runner::{ExamRunner, FlashcardRunner, QuizRunner};
use tracing::debug;

use crate::error::ContentError;

/// Which renderer the active lesson needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewMode {
    Empty,
    Header,
    Locked,
    Video,
    Text,
    Exercise,
    Html,
    Quiz,
    Exam,
    Flashcards,
    Malformed,
    Unavailable,
    Unsupported,
}

/// What the player shows for the active lesson. Interactive kinds own their runner,
/// so per-lesson state disappears with the view.
#[derive(Debug, Clone, PartialEq)]
pub enum LessonView {
    /// The course has no learnable lessons.
    Empty,
    Header {
        title: String,
    },
    Locked {
        lesson_id: LessonId,
        reason: LockReason,
    },
    Video {
        video_id: String,
    },
    Text {
        body: TextBody,
        reading_minutes: usize,
    },
    /// `doc_url` is `None` when the lesson has no usable exercise file.
    Exercise {
        doc_url: Option<String>,
    },
    Html {
        intro: Option<String>,
        html: String,
    },
    Quiz(QuizRunner),
    Exam(ExamRunner),
    Flashcards(FlashcardRunner),
    /// The payload did not match its kind's contract.
    Malformed {
        lesson_id: LessonId,
        message: String,
    },
    /// The payload could not be read.
    Unavailable {
        lesson_id: LessonId,
        message: String,
    },
    Unsupported {
        lesson_id: LessonId,
        kind: String,
    },
}

impl LessonView {
    #[must_use]
    pub fn mode(&self) -> ViewMode {
        match self {
            Self::Empty => ViewMode::Empty,
            Self::Header { .. } => ViewMode::Header,
            Self::Locked { .. } => ViewMode::Locked,
            Self::Video { .. } => ViewMode::Video,
            Self::Text { .. } => ViewMode::Text,
            Self::Exercise { .. } => ViewMode::Exercise,
            Self::Html { .. } => ViewMode::Html,
            Self::Quiz(_) => ViewMode::Quiz,
            Self::Exam(_) => ViewMode::Exam,
            Self::Flashcards(_) => ViewMode::Flashcards,
            Self::Malformed { .. } => ViewMode::Malformed,
            Self::Unavailable { .. } => ViewMode::Unavailable,
            Self::Unsupported { .. } => ViewMode::Unsupported,
        }
    }

    pub(crate) fn from_payload(lesson: &Lesson, payload: LessonPayload) -> Self {
        match payload {
            LessonPayload::Header => Self::Header {
                title: lesson.title().to_owned(),
            },
            LessonPayload::Video { video_id } => Self::Video { video_id },
            LessonPayload::Text(body) => Self::Text {
                reading_minutes: body.reading_minutes(),
                body,
            },
            LessonPayload::Exercise { doc_url } => Self::Exercise {
                doc_url: doc_url.map(String::from),
            },
            LessonPayload::Html { intro, html } => Self::Html { intro, html },
            LessonPayload::Quiz(quiz) => Self::Quiz(QuizRunner::new(quiz)),
            LessonPayload::Exam(questions) => match ExamRunner::new(questions) {
                Ok(runner) => Self::Exam(runner),
                Err(e) => Self::malformed(lesson, &e),
            },
            LessonPayload::Flashcard(cards) => match FlashcardRunner::new(cards) {
                Ok(runner) => Self::Flashcards(runner),
                Err(e) => Self::malformed(lesson, &e),
            },
        }
    }

    pub(crate) fn from_content_error(lesson: &Lesson, error: ContentError) -> Self {
        match error {
            ContentError::Locked(reason) => Self::Locked {
                lesson_id: lesson.id(),
                reason,
            },
            ContentError::Payload(e) => Self::malformed(lesson, &e),
            ContentError::Storage(e) => {
                debug!(lesson = %lesson.id(), error = %e, "lesson payload unavailable");
                Self::Unavailable {
                    lesson_id: lesson.id(),
                    message: e.to_string(),
                }
            }
        }
    }

    fn malformed(lesson: &Lesson, error: &dyn std::fmt::Display) -> Self {
        Self::Malformed {
            lesson_id: lesson.id(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{CourseId, ExamQuestion, LessonKind, QuizPayload};
    use course_core::time::fixed_now;
    use storage::repository::StorageError;

    fn lesson(kind: LessonKind) -> Lesson {
        Lesson::new(LessonId::new(4), CourseId::new(1), "Borrowing", kind, Some(1), fixed_now())
    }

    #[test]
    fn payloads_dispatch_to_their_views() {
        let quiz = QuizPayload::new(vec!["a".into(), "b".into()], 0).unwrap();
        let view = LessonView::from_payload(&lesson(LessonKind::Quiz), LessonPayload::Quiz(quiz));
        assert_eq!(view.mode(), ViewMode::Quiz);

        let question = ExamQuestion::new("q", vec!["a".into(), "b".into()], 1).unwrap();
        let view = LessonView::from_payload(
            &lesson(LessonKind::Exam),
            LessonPayload::Exam(vec![question]),
        );
        assert_eq!(view.mode(), ViewMode::Exam);

        let view = LessonView::from_payload(
            &lesson(LessonKind::Text),
            LessonPayload::Text(TextBody::new("word ".repeat(300), None)),
        );
        assert!(matches!(view, LessonView::Text { reading_minutes: 3, .. }));
    }

    #[test]
    fn empty_deck_renders_malformed() {
        let view = LessonView::from_payload(
            &lesson(LessonKind::Flashcard),
            LessonPayload::Flashcard(Vec::new()),
        );
        assert_eq!(view.mode(), ViewMode::Malformed);
    }

    #[test]
    fn storage_failure_renders_unavailable() {
        let view = LessonView::from_content_error(
            &lesson(LessonKind::Video),
            ContentError::Storage(StorageError::Connection("offline".into())),
        );
        assert_eq!(view.mode(), ViewMode::Unavailable);
    }
}
