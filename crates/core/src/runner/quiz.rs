use crate::model::QuizPayload;

use super::RunnerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
}

/// `Unanswered → Selected → Checked{Correct|Incorrect}`; an incorrect check can be
/// retried back to `Unanswered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    Unanswered,
    Selected(usize),
    Checked { selected: usize, verdict: Verdict },
}

/// Inline single-question quiz with immediate feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRunner {
    payload: QuizPayload,
    state: QuizState,
}

impl QuizRunner {
    #[must_use]
    pub fn new(payload: QuizPayload) -> Self {
        Self {
            payload,
            state: QuizState::Unanswered,
        }
    }

    #[must_use]
    pub fn payload(&self) -> &QuizPayload {
        &self.payload
    }

    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        match self.state {
            QuizState::Unanswered => None,
            QuizState::Selected(option) | QuizState::Checked { selected: option, .. } => {
                Some(option)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `RunnerError::AlreadyChecked` once the answer has been checked and
    /// `RunnerError::OptionOutOfRange` for an unknown option.
    pub fn select_option(&mut self, option: usize) -> Result<(), RunnerError> {
        if matches!(self.state, QuizState::Checked { .. }) {
            return Err(RunnerError::AlreadyChecked);
        }
        let len = self.payload.options().len();
        if option >= len {
            return Err(RunnerError::OptionOutOfRange { option, len });
        }
        self.state = QuizState::Selected(option);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RunnerError::NothingSelected` before a selection and
    /// `RunnerError::AlreadyChecked` after a check.
    pub fn check(&mut self) -> Result<Verdict, RunnerError> {
        let selected = match self.state {
            QuizState::Unanswered => return Err(RunnerError::NothingSelected),
            QuizState::Checked { .. } => return Err(RunnerError::AlreadyChecked),
            QuizState::Selected(option) => option,
        };
        let verdict = if selected == self.payload.correct_index() {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        };
        self.state = QuizState::Checked { selected, verdict };
        Ok(verdict)
    }

    /// Clears an incorrect answer. No attempt counter, no penalty.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::RetryUnavailable` unless the last check was incorrect.
    pub fn retry(&mut self) -> Result<(), RunnerError> {
        match self.state {
            QuizState::Checked {
                verdict: Verdict::Incorrect,
                ..
            } => {
                self.state = QuizState::Unanswered;
                Ok(())
            }
            _ => Err(RunnerError::RetryUnavailable),
        }
    }
}
