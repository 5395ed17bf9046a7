//! Per-card transform pipeline and the build pass over the deck tree.
//!
//! Later stages re-scan text that earlier stages rewrote, so the order in
//! [`PIPELINE`] is part of the output format.

use tracing::debug;

use crate::cloze::transform_cloze;
use crate::deck::{Deck, Note};
use crate::error::Result;
use crate::export::Exporter;
use crate::files::FileSet;
use crate::ids::IdGenerator;
use crate::input::{BoldMode, has_bold, treat_bold_as_input};
use crate::media::MediaResolver;
use crate::settings::{ExportModels, Settings};
use crate::tags::locate_tags;

/// One rewrite applied to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Number `<code>` spans on the front as cloze deletions.
    Cloze,
    /// Turn the bold span on the front into a type-in field.
    InputFront,
    /// Embed images and audio, append video and SoundCloud players.
    Media,
    /// Strip bold markup on the back.
    InputBack,
    /// Move strikethrough spans into tags.
    Tags,
}

/// Stages in the order they run. Reversal happens after the last one.
pub const PIPELINE: [Stage; 5] = [
    Stage::Cloze,
    Stage::InputFront,
    Stage::Media,
    Stage::InputBack,
    Stage::Tags,
];

impl Stage {
    /// Whether the stage runs for `note` under `settings`.
    pub fn is_enabled(self, settings: &Settings, note: &Note) -> bool {
        match self {
            Stage::Cloze => settings.is_cloze,
            Stage::InputFront => settings.use_input && has_bold(&note.front),
            Stage::Media => true,
            Stage::InputBack => settings.use_input && has_bold(&note.back),
            Stage::Tags => settings.use_tags,
        }
    }

    /// Apply the stage to `note`, returning the images it counted.
    pub fn apply<E: Exporter>(
        self,
        note: &mut Note,
        resolver: &mut MediaResolver<'_, E>,
        global_tags: &[String],
    ) -> Result<usize> {
        match self {
            Stage::Cloze => note.front = transform_cloze(&note.front)?,
            Stage::InputFront => {
                let rewrite = treat_bold_as_input(&note.front, BoldMode::Placeholder)?;
                note.front = rewrite.text;
                note.answer = rewrite.answer;
            }
            Stage::Media => return resolver.process_back(note),
            Stage::InputBack => {
                note.back = treat_bold_as_input(&note.back, BoldMode::Inline)?.text;
            }
            Stage::Tags => locate_tags(note, global_tags)?,
        }
        Ok(0)
    }
}

/// Run the pipeline over every card of every deck.
///
/// Each deck gets a fresh id, its card and image counts, and (with
/// `basic_reversed`) a mirrored copy of every card appended after the
/// originals. The root deck carries the note type settings.
pub fn build_decks<E: Exporter>(
    decks: &mut [Deck],
    settings: &Settings,
    files: &FileSet,
    exporter: &mut E,
    ids: &mut IdGenerator,
) -> Result<()> {
    let root_name = decks
        .first()
        .map(|deck| deck.name.clone())
        .unwrap_or_default();
    let mut resolver = MediaResolver::new(files, exporter, &root_name);

    for deck in decks.iter_mut() {
        deck.id = ids.next_id();
        deck.empty_description = settings.is_empty_description;
        deck.card_count = deck.cards.len();
        deck.image_count = 0;

        let Deck {
            name,
            cards,
            image_count,
            global_tags,
            ..
        } = deck;

        for (number, card) in cards.iter_mut().enumerate() {
            card.number = number;
            card.enable_input = settings.use_input;
            card.cloze = settings.is_cloze;
            for stage in PIPELINE {
                if stage.is_enabled(settings, card) {
                    *image_count += stage.apply(card, &mut resolver, global_tags.as_slice())?;
                }
            }
        }

        let mirrored: Vec<Note> = if settings.basic_reversed {
            let count = cards.len();
            cards
                .iter()
                .enumerate()
                .map(|(index, card)| card.mirrored(count + index))
                .collect()
        } else {
            Vec::new()
        };
        if settings.reversed {
            cards.iter_mut().for_each(Note::swap_sides);
        }
        cards.extend(mirrored);

        debug!(deck = %name, cards = cards.len(), images = *image_count, "built deck");
    }

    if let Some(root) = decks.first_mut() {
        root.models = Some(ExportModels::from(settings));
    }
    Ok(())
}
