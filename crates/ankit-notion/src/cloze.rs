//! Cloze deletions.
//!
//! Anki's cloze deletion feature lets you create cards where portions of text are
//! hidden, prompting you to recall the missing information. Deletions use the
//! format `{{c1::text}}`, optionally with a hint: `{{c1::text::hint}}`.
//!
//! In a Notion export, every inline code span on the front of a card marks a
//! deletion:
//!
//! ```
//! use ankit_notion::cloze::transform_cloze;
//!
//! let front = transform_cloze("<code>Paris</code> is the capital").unwrap();
//! assert_eq!(front, "{{c1::Paris}} is the capital");
//! ```

use crate::dom::{self, Fragment};
use crate::error::Result;
use crate::text::replace_all;

/// Auto-incrementing cloze numbers for one card.
#[derive(Debug, Default)]
pub struct ClozeBuilder {
    counter: u32,
}

impl ClozeBuilder {
    /// Create a new cloze builder starting at c1.
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Claim the next cloze number.
    pub fn next_number(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }
}

/// Whether a code span already holds an author-numbered deletion.
///
/// KaTeX output can contain `{{c` and `}}` by accident, so it never counts.
fn is_hand_numbered(content: &str) -> bool {
    content.contains("{{c") && content.contains("}}") && !content.contains("KaTex")
}

/// Rewrite every `<code>` span in `input` into a cloze deletion.
///
/// Spans are numbered in document order starting at 1. Spans whose content
/// is already a cloze deletion are unwrapped and keep their own number, and
/// a literal `}}` inside generated deletions becomes `} }` so Anki closes the
/// deletion at the right place.
pub fn transform_cloze(input: &str) -> Result<String> {
    let fragment = Fragment::parse(input);
    let spans = fragment.select("code")?;
    if spans.is_empty() {
        return Ok(input.to_string());
    }

    let mut builder = ClozeBuilder::new();
    for span in spans {
        let node = span.as_node();
        let content = dom::inner_html(node);
        if content.is_empty() {
            continue;
        }
        if is_hand_numbered(&content) {
            dom::unwrap(node);
            continue;
        }

        let number = builder.next_number();
        dom::edit_text(node, |text| replace_all(text, "}}", "} }"));
        node.insert_before(kuchiki::NodeRef::new_text(format!("{{{{c{}::", number)));
        node.insert_after(kuchiki::NodeRef::new_text("}}"));
        dom::unwrap(node);
    }

    Ok(fragment.to_html())
}
