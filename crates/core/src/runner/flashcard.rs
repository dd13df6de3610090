use crate::model::Flashcard;

use super::RunnerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashcardStep {
    Moved,
    /// `next` was called on the last card; the index is unchanged.
    DeckEnd,
}

/// Sequential flip-card deck. Flipping is purely visual and is reset by every move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardRunner {
    cards: Vec<Flashcard>,
    index: usize,
    flipped: bool,
}

impl FlashcardRunner {
    /// # Errors
    ///
    /// Returns `RunnerError::Empty` for an empty deck.
    pub fn new(cards: Vec<Flashcard>) -> Result<Self, RunnerError> {
        if cards.is_empty() {
            return Err(RunnerError::Empty("flashcard deck"));
        }
        Ok(Self {
            cards,
            index: 0,
            flipped: false,
        })
    }

    #[must_use]
    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    #[must_use]
    pub fn current(&self) -> &Flashcard {
        &self.cards[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.cards.len()
    }

    /// Position through the deck, `1..=100`.
    #[must_use]
    pub fn percent_through(&self) -> u32 {
        crate::model::percent(self.index + 1, self.cards.len())
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn next(&mut self) -> FlashcardStep {
        if self.is_last() {
            return FlashcardStep::DeckEnd;
        }
        self.index += 1;
        self.flipped = false;
        FlashcardStep::Moved
    }

    /// Returns `false` when already on the first card.
    pub fn prev(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.flipped = false;
        true
    }
}
