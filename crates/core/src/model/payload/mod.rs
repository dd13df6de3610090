pub mod exam;
pub mod flashcard;
pub mod quiz;
pub mod text;

use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::model::lesson::LessonKind;

pub use exam::ExamQuestion;
pub use flashcard::Flashcard;
pub use quiz::QuizPayload;
pub use text::TextBody;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A lesson payload could not be read into the shape its kind requires.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("expected {expected} payload")]
    Shape { expected: &'static str },

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("{kind} payload has no entries")]
    Empty { kind: &'static str },

    #[error("answer key {answer} is outside the {options} available options")]
    AnswerOutOfRange { answer: usize, options: usize },

    #[error("question {index}: {source}")]
    Question {
        index: usize,
        #[source]
        source: Box<PayloadError>,
    },

    #[error("lesson kind `{0}` is not supported")]
    UnsupportedKind(String),
}

//
// ─── PAYLOAD ───────────────────────────────────────────────────────────────────
//

/// Parsed, kind-specific content of a lesson.
#[derive(Debug, Clone, PartialEq)]
pub enum LessonPayload {
    Video { video_id: String },
    Header,
    Quiz(QuizPayload),
    Text(TextBody),
    /// `doc_url` is `None` when the link is absent or not a valid URL.
    Exercise { doc_url: Option<Url> },
    Html { intro: Option<String>, html: String },
    Exam(Vec<ExamQuestion>),
    Flashcard(Vec<Flashcard>),
}

impl LessonPayload {
    /// Parses a raw persisted payload according to the lesson kind.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError` when the raw value does not match the kind's contract,
    /// or `PayloadError::UnsupportedKind` for unknown kinds.
    pub fn parse(kind: &LessonKind, raw: &Value) -> Result<Self, PayloadError> {
        match kind {
            LessonKind::Header => Ok(Self::Header),
            LessonKind::Video => {
                let video_id = string_field(raw, "videoId")
                    .filter(|id| !id.trim().is_empty())
                    .ok_or(PayloadError::MissingField("videoId"))?;
                Ok(Self::Video { video_id })
            }
            LessonKind::Quiz => QuizPayload::parse(raw).map(Self::Quiz),
            LessonKind::Text => Ok(Self::Text(TextBody::new(
                string_field(raw, "content").unwrap_or_default(),
                string_field(raw, "image"),
            ))),
            LessonKind::Exercise => Ok(Self::Exercise {
                doc_url: string_field(raw, "docUrl").and_then(|link| Url::parse(link.trim()).ok()),
            }),
            LessonKind::Html => Ok(Self::Html {
                intro: string_field(raw, "content").filter(|body| !body.trim().is_empty()),
                html: string_field(raw, "htmlCode").unwrap_or_default(),
            }),
            LessonKind::Exam => exam::parse_questions(raw).map(Self::Exam),
            LessonKind::Flashcard => flashcard::parse_deck(raw).map(Self::Flashcard),
            LessonKind::Unsupported(tag) => Err(PayloadError::UnsupportedKind(tag.clone())),
        }
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Resolves a list payload that may be a bare array, a JSON string holding an array,
/// or an object wrapping the array under one of `keys`.
pub(crate) fn resolve_array<'a>(
    raw: &'a Value,
    keys: &[&str],
    expected: &'static str,
) -> Result<std::borrow::Cow<'a, [Value]>, PayloadError> {
    use std::borrow::Cow;

    match raw {
        Value::Array(items) => Ok(Cow::Borrowed(items.as_slice())),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => Ok(Cow::Owned(items)),
            Ok(_) => Err(PayloadError::Shape { expected }),
            Err(e) => Err(PayloadError::InvalidJson(e.to_string())),
        },
        Value::Object(map) => keys
            .iter()
            .find_map(|key| map.get(*key))
            .ok_or(PayloadError::Shape { expected })
            .and_then(|inner| match inner {
                Value::Object(_) => Err(PayloadError::Shape { expected }),
                other => resolve_array(other, &[], expected),
            }),
        _ => Err(PayloadError::Shape { expected }),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_needs_no_payload() {
        let payload = LessonPayload::parse(&LessonKind::Header, &Value::Null).unwrap();
        assert_eq!(payload, LessonPayload::Header);
    }

    #[test]
    fn video_requires_video_id() {
        let err = LessonPayload::parse(&LessonKind::Video, &json!({})).unwrap_err();
        assert_eq!(err, PayloadError::MissingField("videoId"));

        let ok = LessonPayload::parse(&LessonKind::Video, &json!({"videoId": "abc"})).unwrap();
        assert_eq!(ok, LessonPayload::Video { video_id: "abc".into() });
    }

    #[test]
    fn exercise_with_bad_link_has_no_document() {
        let payload =
            LessonPayload::parse(&LessonKind::Exercise, &json!({"docUrl": "not a url"})).unwrap();
        assert_eq!(payload, LessonPayload::Exercise { doc_url: None });

        let payload = LessonPayload::parse(
            &LessonKind::Exercise,
            &json!({"docUrl": "https://example.com/sheet.pdf"}),
        )
        .unwrap();
        assert!(matches!(payload, LessonPayload::Exercise { doc_url: Some(_) }));
    }

    #[test]
    fn unsupported_kind_is_an_error() {
        let kind = LessonKind::from_tag("podcast");
        let err = LessonPayload::parse(&kind, &json!({})).unwrap_err();
        assert_eq!(err, PayloadError::UnsupportedKind("podcast".into()));
    }

    #[test]
    fn resolve_array_accepts_wrapped_and_stringified_lists() {
        let wrapped = json!({"questions": [1, 2]});
        assert_eq!(resolve_array(&wrapped, &["questions"], "list").unwrap().len(), 2);

        let stringified = json!("[1, 2, 3]");
        assert_eq!(resolve_array(&stringified, &[], "list").unwrap().len(), 3);

        let broken = json!("[1, 2");
        assert!(matches!(
            resolve_array(&broken, &[], "list").unwrap_err(),
            PayloadError::InvalidJson(_)
        ));
    }
}
