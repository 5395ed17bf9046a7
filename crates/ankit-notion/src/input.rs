//! Bold spans as type-in answers.

use crate::dom::{self, Fragment};
use crate::error::Result;

/// Placeholder rendered as a type-in field by the input note type.
pub const INPUT_PLACEHOLDER: &str = "{{type:Input}}";

/// Result of rewriting the bold spans of one side of a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoldRewrite {
    /// The rewritten markup.
    pub text: String,
    /// Inner markup of the last bold span, if any.
    pub answer: Option<String>,
}

/// How bold spans are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoldMode {
    /// Replace each span with [`INPUT_PLACEHOLDER`] and record its content.
    Placeholder,
    /// Replace each span with its content.
    Inline,
}

/// Whether `input` contains a bold span.
pub fn has_bold(input: &str) -> bool {
    input.contains("<strong")
}

/// Rewrite every `<strong>` span in `input`.
pub fn treat_bold_as_input(input: &str, mode: BoldMode) -> Result<BoldRewrite> {
    let fragment = Fragment::parse(input);
    let spans = fragment.select("strong")?;
    if spans.is_empty() {
        return Ok(BoldRewrite {
            text: input.to_string(),
            answer: None,
        });
    }

    let mut answer = None;
    for span in spans {
        let node = span.as_node();
        let content = dom::inner_html(node);
        if content.is_empty() {
            continue;
        }
        match mode {
            BoldMode::Placeholder => dom::replace_with_text(node, INPUT_PLACEHOLDER),
            BoldMode::Inline => dom::unwrap(node),
        }
        answer = Some(content);
    }

    Ok(BoldRewrite {
        text: fragment.to_html(),
        answer,
    })
}
