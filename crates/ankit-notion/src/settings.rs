//! Conversion settings.
//!
//! Settings are immutable for the duration of a build. They are usually
//! loaded from a TOML file; every key is optional.
//!
//! # Example TOML
//!
//! ```toml
//! deck_name = "Biology"
//! is_cloze = true
//! use_tags = true
//! toggle_mode = "open_toggle"
//! font_size = "24"
//!
//! basic_model_name = "Notion Basic"
//! cloze_model_name = "Notion Cloze"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Recognised conversion options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Override for the root deck name (defaults to the page title).
    pub deck_name: Option<String>,

    /// Select every `.toggle` element and report notes without a cherry marker.
    pub is_cherry: bool,

    /// Select every `.toggle` element instead of only top-level lists.
    pub is_all: bool,

    /// Force toggles open or closed in the exported markup.
    pub toggle_mode: ToggleMode,

    /// Collapse nested toggles in the back of a card.
    pub max_one: bool,

    /// Build the back only from the toggle's direct paragraphs.
    pub is_text_only_back: bool,

    /// Strip Notion's link underline declaration from page styles.
    pub no_underline: bool,

    /// Card font size, e.g. `"24"` or `"24px"`.
    pub font_size: Option<String>,

    /// Turn bold spans into type-in answer fields.
    pub use_input: bool,

    /// Turn inline code spans into cloze deletions.
    pub is_cloze: bool,

    /// Turn strikethrough spans into tags.
    pub use_tags: bool,

    /// Add a mirrored copy of every card.
    pub basic_reversed: bool,

    /// Swap front and back of every card.
    pub reversed: bool,

    /// Leave deck descriptions empty.
    pub is_empty_description: bool,

    /// Name of the cloze note type.
    pub cloze_model_name: Option<String>,

    /// ID of the cloze note type.
    pub cloze_model_id: Option<i64>,

    /// Name of the basic note type.
    pub basic_model_name: Option<String>,

    /// ID of the basic note type.
    pub basic_model_id: Option<i64>,

    /// Name of the input note type.
    pub input_model_name: Option<String>,

    /// ID of the input note type.
    pub input_model_id: Option<i64>,

    /// Card template style (`"nostyle"` disables page CSS).
    pub template: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The root deck name override, ignoring empty values.
    pub fn deck_name(&self) -> Option<&str> {
        self.deck_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Whether every `.toggle` element is a card candidate.
    pub fn selects_all_toggles(&self) -> bool {
        self.is_cherry || self.is_all
    }
}

/// How `<details>` elements are rendered in the exported cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleMode {
    /// Force every toggle open.
    OpenToggle,
    /// Force every toggle closed.
    CloseToggle,
    /// Keep the export's own state.
    #[default]
    Unset,
}

/// Note type names and ids attached to the root deck of the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportModels {
    /// Cloze note type name.
    pub cloze_model_name: Option<String>,
    /// Cloze note type id.
    pub cloze_model_id: Option<i64>,
    /// Basic note type name.
    pub basic_model_name: Option<String>,
    /// Basic note type id.
    pub basic_model_id: Option<i64>,
    /// Input note type name.
    pub input_model_name: Option<String>,
    /// Input note type id.
    pub input_model_id: Option<i64>,
    /// Card template style.
    pub template: Option<String>,
}

impl From<&Settings> for ExportModels {
    fn from(settings: &Settings) -> Self {
        Self {
            cloze_model_name: settings.cloze_model_name.clone(),
            cloze_model_id: settings.cloze_model_id,
            basic_model_name: settings.basic_model_name.clone(),
            basic_model_id: settings.basic_model_id,
            input_model_name: settings.input_model_name.clone(),
            input_model_id: settings.input_model_id,
            template: settings.template.clone(),
        }
    }
}
