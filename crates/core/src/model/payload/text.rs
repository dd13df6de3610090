/// Characters read per minute for the reading-time estimate.
const CHARS_PER_MINUTE: usize = 500;

/// Body of a reading lesson. Formatting is left to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBody {
    body: String,
    image: Option<String>,
}

impl TextBody {
    #[must_use]
    pub fn new(body: impl Into<String>, image: Option<String>) -> Self {
        Self {
            body: body.into(),
            image: image.filter(|src| !src.trim().is_empty()),
        }
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Estimated reading time in whole minutes, never less than one.
    #[must_use]
    pub fn reading_minutes(&self) -> usize {
        strip_tags(&self.body).div_ceil(CHARS_PER_MINUTE).max(1)
    }
}

/// Counts characters outside of `<...>` markup.
fn strip_tags(body: &str) -> usize {
    let mut in_tag = false;
    body.chars()
        .filter(|ch| match ch {
            '<' => {
                in_tag = true;
                false
            }
            '>' if in_tag => {
                in_tag = false;
                false
            }
            _ => !in_tag,
        })
        .count()
}
