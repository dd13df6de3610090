mod enrollment;
mod ids;
mod learner;
mod lesson;
pub mod payload;
mod progress;

pub use ids::{CourseId, LearnerId, LessonId, ParseIdError};
pub use payload::{
    ExamQuestion, Flashcard, LessonPayload, PayloadError, QuizPayload, TextBody,
};

pub use enrollment::{AccessType, Enrollment, EnrollmentError, EnrollmentStatus};
pub use learner::{Learner, Role};
pub use lesson::{Course, Lesson, LessonKind, sort_lessons};
pub use progress::{Progress, percent};
