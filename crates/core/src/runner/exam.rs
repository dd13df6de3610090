use std::collections::{BTreeMap, BTreeSet};

use crate::model::ExamQuestion;

use super::RunnerError;

/// Answers, reveals and the final score for one sitting of an exam.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamSession {
    current_index: usize,
    answers: BTreeMap<usize, usize>,
    revealed: BTreeSet<usize>,
    submitted: bool,
    score: Option<u32>,
}

impl ExamSession {
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    #[must_use]
    pub fn revealed(&self) -> &BTreeSet<usize> {
        &self.revealed
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Number of correct answers, set exactly once on submit.
    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { score: u32 },
    /// A second submit is a no-op that reports the original score.
    AlreadySubmitted { score: u32 },
}

impl SubmitOutcome {
    #[must_use]
    pub fn score(self) -> u32 {
        match self {
            Self::Submitted { score } | Self::AlreadySubmitted { score } => score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Unanswered,
    Answered,
    /// The key was shown before submission; the question is frozen.
    Revealed,
    Correct,
    Incorrect,
}

/// One cell of the question map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapCell {
    Current,
    Correct,
    Incorrect,
    Answered,
    Unanswered,
}

/// Multi-question exam with per-question reveal and a single scored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamRunner {
    questions: Vec<ExamQuestion>,
    session: ExamSession,
}

impl ExamRunner {
    /// # Errors
    ///
    /// Returns `RunnerError::Empty` when there are no questions.
    pub fn new(questions: Vec<ExamQuestion>) -> Result<Self, RunnerError> {
        if questions.is_empty() {
            return Err(RunnerError::Empty("exam"));
        }
        Ok(Self {
            questions,
            session: ExamSession::default(),
        })
    }

    #[must_use]
    pub fn questions(&self) -> &[ExamQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn current(&self) -> &ExamQuestion {
        &self.questions[self.session.current_index]
    }

    /// Score as a rounded percentage of all questions, once submitted.
    #[must_use]
    pub fn score_percent(&self) -> Option<u32> {
        self.session
            .score
            .map(|score| crate::model::percent(score as usize, self.questions.len()))
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.session.answers.len()
    }

    /// Records (or replaces) the answer for `question`.
    ///
    /// # Errors
    ///
    /// Fails after submission, on a revealed question, or for indices out of range.
    pub fn select_option(&mut self, question: usize, option: usize) -> Result<(), RunnerError> {
        if self.session.submitted {
            return Err(RunnerError::AlreadySubmitted);
        }
        let entry = self.question(question)?;
        if self.session.revealed.contains(&question) {
            return Err(RunnerError::QuestionLocked(question));
        }
        let len = entry.options().len();
        if option >= len {
            return Err(RunnerError::OptionOutOfRange { option, len });
        }
        self.session.answers.insert(question, option);
        Ok(())
    }

    /// Shows the key for `question` and freezes its answer. Revealing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::QuestionOutOfRange` for an unknown question.
    pub fn reveal(&mut self, question: usize) -> Result<(), RunnerError> {
        self.question(question)?;
        self.session.revealed.insert(question);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RunnerError::QuestionOutOfRange` for an unknown question.
    pub fn jump_to(&mut self, question: usize) -> Result<(), RunnerError> {
        self.question(question)?;
        self.session.current_index = question;
        Ok(())
    }

    /// Moves to the next question, clamped at the last one.
    pub fn next(&mut self) {
        let last = self.questions.len() - 1;
        self.session.current_index = (self.session.current_index + 1).min(last);
    }

    /// Moves to the previous question, clamped at the first one.
    pub fn prev(&mut self) {
        self.session.current_index = self.session.current_index.saturating_sub(1);
    }

    /// Scores the exam. Unanswered questions count as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::ConfirmationRequired` when a first submission is not
    /// confirmed.
    pub fn submit(&mut self, confirmed: bool) -> Result<SubmitOutcome, RunnerError> {
        if let (true, Some(score)) = (self.session.submitted, self.session.score) {
            return Ok(SubmitOutcome::AlreadySubmitted { score });
        }
        if !confirmed {
            return Err(RunnerError::ConfirmationRequired);
        }
        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(index, question)| {
                self.session
                    .answers
                    .get(index)
                    .is_some_and(|selected| question.is_correct(*selected))
            })
            .count();
        let score = u32::try_from(correct).unwrap_or(u32::MAX);
        self.session.submitted = true;
        self.session.score = Some(score);
        Ok(SubmitOutcome::Submitted { score })
    }

    /// The key for `question`, visible once revealed or after submission.
    #[must_use]
    pub fn visible_answer(&self, question: usize) -> Option<usize> {
        let entry = self.questions.get(question)?;
        (self.session.submitted || self.session.revealed.contains(&question))
            .then(|| entry.answer_index())
    }

    #[must_use]
    pub fn question_status(&self, question: usize) -> QuestionStatus {
        let answer = self.session.answers.get(&question).copied();
        if self.session.submitted {
            let correct = match (self.questions.get(question), answer) {
                (Some(entry), Some(selected)) => entry.is_correct(selected),
                _ => false,
            };
            return if correct {
                QuestionStatus::Correct
            } else {
                QuestionStatus::Incorrect
            };
        }
        if self.session.revealed.contains(&question) {
            QuestionStatus::Revealed
        } else if answer.is_some() {
            QuestionStatus::Answered
        } else {
            QuestionStatus::Unanswered
        }
    }

    /// The navigation map, one cell per question.
    #[must_use]
    pub fn map(&self) -> Vec<MapCell> {
        (0..self.questions.len()).map(|index| self.map_cell(index)).collect()
    }

    #[must_use]
    pub fn map_cell(&self, question: usize) -> MapCell {
        if question == self.session.current_index {
            return MapCell::Current;
        }
        let Some(selected) = self.session.answers.get(&question).copied() else {
            return MapCell::Unanswered;
        };
        if !self.session.submitted {
            return MapCell::Answered;
        }
        match self.questions.get(question) {
            Some(entry) if entry.is_correct(selected) => MapCell::Correct,
            _ => MapCell::Incorrect,
        }
    }

    fn question(&self, index: usize) -> Result<&ExamQuestion, RunnerError> {
        self.questions
            .get(index)
            .ok_or(RunnerError::QuestionOutOfRange {
                index,
                len: self.questions.len(),
            })
    }
}
