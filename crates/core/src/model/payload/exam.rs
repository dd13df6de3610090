use serde::Deserialize;
use serde_json::Value;

use super::{PayloadError, resolve_array};

/// One multiple-choice exam question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamQuestion {
    question: String,
    options: Vec<String>,
    answer_index: usize,
    explanation: Option<String>,
    image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    question: String,
    #[serde(default)]
    options: Vec<String>,
    answer_index: Option<usize>,
    correct_answer: Option<usize>,
    explanation: Option<String>,
    image: Option<String>,
}

impl ExamQuestion {
    /// Builds a question, checking that the answer key points at an option.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::Empty` when there are no options and
    /// `PayloadError::AnswerOutOfRange` when the key is past the last option.
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        answer_index: usize,
    ) -> Result<Self, PayloadError> {
        if options.is_empty() {
            return Err(PayloadError::Empty { kind: "options" });
        }
        if answer_index >= options.len() {
            return Err(PayloadError::AnswerOutOfRange {
                answer: answer_index,
                options: options.len(),
            });
        }
        Ok(Self {
            question: question.into(),
            options,
            answer_index,
            explanation: None,
            image: None,
        })
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer_index(&self) -> usize {
        self.answer_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        self.answer_index == selected
    }

    fn from_raw(raw: RawQuestion) -> Result<Self, PayloadError> {
        // `answerIndex` wins; older payloads only carry `correctAnswer`.
        let key = raw.answer_index.or(raw.correct_answer).unwrap_or(0);
        let mut question = Self::new(raw.question, raw.options, key)?;
        question.explanation = raw.explanation.filter(|text| !text.trim().is_empty());
        question.image = raw.image.filter(|src| !src.trim().is_empty());
        Ok(question)
    }
}

/// Parses an exam payload into its question list.
///
/// # Errors
///
/// Returns `PayloadError` if the payload is not a question array, is empty, or any
/// question is malformed.
pub fn parse_questions(raw: &Value) -> Result<Vec<ExamQuestion>, PayloadError> {
    let items = resolve_array(raw, &["questions", "content"], "exam question array")?;
    if items.is_empty() {
        return Err(PayloadError::Empty { kind: "exam" });
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            RawQuestion::deserialize(item)
                .map_err(|e| PayloadError::InvalidJson(e.to_string()))
                .and_then(ExamQuestion::from_raw)
                .map_err(|source| PayloadError::Question {
                    index,
                    source: Box::new(source),
                })
        })
        .collect()
}
