//! Strikethrough spans as tags.

use crate::deck::Note;
use crate::dom::Fragment;
use crate::error::Result;

/// Split a strikethrough span's text into tags.
///
/// `"chapter one, biology"` becomes `["chapter-one", "biology"]`.
pub fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(|tag| {
            tag.trim()
                .chars()
                .map(|c| if c.is_whitespace() { '-' } else { c })
                .collect::<String>()
        })
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Collect `<del>` spans of `input` as tags and remove them from the markup.
fn extract_deletions(input: &str, tags: &mut Vec<String>) -> Result<String> {
    if input.is_empty() {
        return Ok(String::new());
    }
    let fragment = Fragment::parse(input);
    let deletions = fragment.select("del")?;
    if deletions.is_empty() {
        return Ok(input.to_string());
    }
    for deletion in deletions {
        let node = deletion.as_node();
        tags.extend(split_tags(&node.text_contents()));
        node.detach();
    }
    Ok(fragment.to_html())
}

/// Move strikethrough spans of a note into its tags.
///
/// Front tags come first, then back tags, then the page-level tags captured
/// from the owning page. Tags are not de-duplicated.
pub fn locate_tags(note: &mut Note, global_tags: &[String]) -> Result<()> {
    let mut tags = Vec::new();
    note.front = extract_deletions(&note.front, &mut tags)?;
    note.back = extract_deletions(&note.back, &mut tags)?;
    for source in global_tags {
        tags.extend(split_tags(source));
    }
    note.tags.extend(tags);
    Ok(())
}
