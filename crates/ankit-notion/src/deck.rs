//! Deck tree types.
//!
//! A build produces one [`Deck`] per visited page. Decks are stored flat, in
//! depth-first visiting order; the hierarchy lives in the names, which join
//! ancestor titles with `::`.

use serde::Serialize;

use crate::settings::ExportModels;

/// A single flashcard candidate extracted from a toggle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Note {
    /// Question side markup.
    pub front: String,

    /// Answer side markup.
    pub back: String,

    /// Tags in extraction order (duplicates allowed).
    pub tags: Vec<String>,

    /// Media filenames registered with the exporter for this note.
    pub media: Vec<String>,

    /// Position within the deck's final card sequence.
    pub number: usize,

    /// Whether the note is rendered with the cloze note type.
    pub cloze: bool,

    /// Whether bold-to-input conversion was enabled for this note.
    pub enable_input: bool,

    /// Expected answer of a generated input field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl Note {
    /// Create a note from front and back markup.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            ..Default::default()
        }
    }

    /// A copy with front and back swapped, keeping tags and media.
    pub fn mirrored(&self, number: usize) -> Self {
        Self {
            front: self.back.clone(),
            back: self.front.clone(),
            tags: self.tags.clone(),
            media: self.media.clone(),
            number,
            ..Default::default()
        }
    }

    /// Swap front and back in place.
    pub fn swap_sides(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }
}

/// A deck built from one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Deck {
    /// Full hierarchical name, e.g. `Root::Chapter1`.
    pub name: String,

    /// Cards: extracted notes followed by any generated duplicates.
    pub cards: Vec<Note>,

    /// Page cover image reference.
    pub image: Option<String>,

    /// Page CSS; only the root deck's style reaches the package.
    #[serde(skip)]
    pub style: Option<String>,

    /// Numeric deck id, unique within a build.
    pub id: i64,

    /// Number of extracted notes (before reversed duplicates are added).
    pub card_count: usize,

    /// Number of `<img>` tags seen in card backs.
    pub image_count: usize,

    /// Whether the package should leave the deck description empty.
    pub empty_description: bool,

    /// Note type configuration, present on the root deck only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<ExportModels>,

    /// Tag source captured from the page's top-level paragraphs.
    #[serde(skip)]
    pub global_tags: Vec<String>,
}

impl Deck {
    /// Create a deck from extracted page data.
    pub fn new(
        name: impl Into<String>,
        cards: Vec<Note>,
        image: Option<String>,
        style: Option<String>,
        id: i64,
    ) -> Self {
        Self {
            name: name.into(),
            cards,
            image,
            style,
            id,
            ..Default::default()
        }
    }

    /// The page style with blank lines and surrounding whitespace removed.
    pub fn clean_style(&self) -> String {
        self.style
            .as_deref()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
