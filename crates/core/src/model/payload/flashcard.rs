use serde_json::Value;

use super::{PayloadError, resolve_array};

const FRONT_KEYS: [&str; 3] = ["front", "question", "term"];
const BACK_KEYS: [&str; 3] = ["back", "answer", "definition"];

/// A two-sided study card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flashcard {
    front: String,
    back: String,
    topic: Option<String>,
}

impl Flashcard {
    #[must_use]
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            topic: None,
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn front(&self) -> &str {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &str {
        &self.back
    }

    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    fn from_value(item: &Value) -> Result<Self, PayloadError> {
        let Value::Object(fields) = item else {
            return Err(PayloadError::Shape {
                expected: "flashcard object",
            });
        };
        let side = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| fields.get(*key))
                .find_map(text_of)
                .unwrap_or_default()
        };
        Ok(Self {
            front: side(&FRONT_KEYS),
            back: side(&BACK_KEYS),
            topic: fields
                .get("topic")
                .and_then(text_of),
        })
    }
}

/// Non-empty text of a scalar field; numbers are rendered as written.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a flashcard deck payload.
///
/// # Errors
///
/// Returns `PayloadError` if the payload is not a card array, the array is empty, or
/// an entry is not an object.
pub fn parse_deck(raw: &Value) -> Result<Vec<Flashcard>, PayloadError> {
    let items = resolve_array(raw, &["cards", "flashcardData"], "flashcard array")?;
    if items.is_empty() {
        return Err(PayloadError::Empty { kind: "flashcard" });
    }
    items.iter().map(Flashcard::from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_field_aliases() {
        let raw = json!([
            {"front": "F", "back": "B", "topic": "t"},
            {"question": "Q", "answer": "A"},
            {"term": "T", "definition": "D"}
        ]);
        let deck = parse_deck(&raw).unwrap();
        assert_eq!(deck[0], Flashcard::new("F", "B").with_topic("t"));
        assert_eq!(deck[1], Flashcard::new("Q", "A"));
        assert_eq!(deck[2], Flashcard::new("T", "D"));
    }

    #[test]
    fn first_non_empty_alias_wins() {
        let raw = json!([{"front": "", "question": "Q", "back": "B"}]);
        assert_eq!(parse_deck(&raw).unwrap()[0].front(), "Q");
    }

    #[test]
    fn missing_side_is_blank() {
        let raw = json!([{"front": "only front"}]);
        assert_eq!(parse_deck(&raw).unwrap()[0].back(), "");
    }

    #[test]
    fn empty_deck_is_malformed() {
        assert_eq!(
            parse_deck(&json!({"cards": []})).unwrap_err(),
            PayloadError::Empty { kind: "flashcard" }
        );
        assert!(parse_deck(&json!([1, 2])).is_err());
    }
}
