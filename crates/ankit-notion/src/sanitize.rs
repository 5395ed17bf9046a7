//! Filtering of extracted note candidates.

use crate::deck::Note;
use crate::settings::Settings;

/// Whether the front carries a code span that may become a cloze deletion.
///
/// This is a coarse literal check; numbering happens in [`crate::cloze`].
pub fn has_cloze_deletions(input: &str) -> bool {
    input.contains("code")
}

/// Whether the note can become an input card under the given settings.
pub fn is_valid_input_card(note: &Note, settings: &Settings) -> bool {
    settings.use_input && note.front.contains("strong")
}

/// Whether a candidate is worth keeping.
pub fn is_keepable(note: &Note, settings: &Settings) -> bool {
    !note.front.is_empty()
        && (has_cloze_deletions(&note.front)
            || !note.back.is_empty()
            || is_valid_input_card(note, settings))
}

/// Drop candidates that would produce broken cards.
pub fn sanitize(notes: Vec<Note>, settings: &Settings) -> Vec<Note> {
    notes
        .into_iter()
        .filter(|note| is_keepable(note, settings))
        .collect()
}
