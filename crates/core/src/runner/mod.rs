//! Interactive assessment state machines.
//!
//! Runners are plain values owned by one active lesson. They never touch storage;
//! the session layer reacts to the outcomes they return.

mod exam;
mod flashcard;
mod quiz;

use thiserror::Error;

pub use exam::{ExamRunner, ExamSession, MapCell, QuestionStatus, SubmitOutcome};
pub use flashcard::{FlashcardRunner, FlashcardStep};
pub use quiz::{QuizRunner, QuizState, Verdict};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunnerError {
    #[error("option {option} is out of range ({len} options)")]
    OptionOutOfRange { option: usize, len: usize },

    #[error("question {index} is out of range ({len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("no option selected")]
    NothingSelected,

    #[error("answer already checked")]
    AlreadyChecked,

    #[error("nothing to retry")]
    RetryUnavailable,

    #[error("question {0} is locked")]
    QuestionLocked(usize),

    #[error("exam already submitted")]
    AlreadySubmitted,

    #[error("submission requires confirmation")]
    ConfirmationRequired,

    #[error("{0} has no entries")]
    Empty(&'static str),
}
