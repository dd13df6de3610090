use serde::Deserialize;
use serde_json::Value;

use super::PayloadError;

/// Single inline question: the lesson title is the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPayload {
    options: Vec<String>,
    correct_index: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuiz {
    #[serde(default)]
    options: Vec<String>,
    correct_answer: Option<usize>,
    correct_index: Option<usize>,
}

impl QuizPayload {
    /// # Errors
    ///
    /// Returns `PayloadError::Empty` without options and
    /// `PayloadError::AnswerOutOfRange` if the key is not one of them.
    pub fn new(options: Vec<String>, correct_index: usize) -> Result<Self, PayloadError> {
        if options.is_empty() {
            return Err(PayloadError::Empty { kind: "quiz" });
        }
        if correct_index >= options.len() {
            return Err(PayloadError::AnswerOutOfRange {
                answer: correct_index,
                options: options.len(),
            });
        }
        Ok(Self {
            options,
            correct_index,
        })
    }

    pub(crate) fn parse(raw: &Value) -> Result<Self, PayloadError> {
        let raw = RawQuiz::deserialize(raw).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
        let key = raw
            .correct_answer
            .or(raw.correct_index)
            .ok_or(PayloadError::MissingField("correctAnswer"))?;
        Self::new(raw.options, key)
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_correct_answer_key() {
        let quiz = QuizPayload::parse(&json!({"options": ["a", "b", "c"], "correctAnswer": 2})).unwrap();
        assert_eq!(quiz.correct_index(), 2);
        assert_eq!(quiz.options().len(), 3);
    }

    #[test]
    fn missing_key_is_malformed() {
        let err = QuizPayload::parse(&json!({"options": ["a"]})).unwrap_err();
        assert_eq!(err, PayloadError::MissingField("correctAnswer"));
    }

    #[test]
    fn key_must_point_at_an_option() {
        let err = QuizPayload::new(vec!["a".into()], 1).unwrap_err();
        assert_eq!(err, PayloadError::AnswerOutOfRange { answer: 1, options: 1 });
    }
}
