//! Convert Notion-style HTML exports into hierarchical Anki decks.
//!
//! An export is a set of HTML pages. Each page becomes a deck, each toggle
//! list on it becomes a card, and pages linked from a page become its
//! subdecks (`Parent::Child`). Cards then run through a fixed pipeline of
//! rewrites before being handed to an [`Exporter`]:
//!
//! 1. `<code>` spans on the front become cloze deletions
//! 2. a bold span on the front becomes a type-in field
//! 3. images and `.mp3` links are embedded, video and SoundCloud links get players
//! 4. bold markup on the back is stripped
//! 5. strikethrough spans become tags
//!
//! followed by optional reversal of every card.
//!
//! # Features
//!
//! - `apkg` (default): Enable .apkg package generation
//!
//! # Usage
//!
//! ```no_run
//! use ankit_notion::{FileSet, Settings, prepare_deck_in};
//!
//! # async fn example() -> ankit_notion::Result<()> {
//! let files = FileSet::from_dir("export")?;
//! let settings = Settings::parse("is_cloze = true\nuse_tags = true")?;
//! let deck = prepare_deck_in("/tmp/ankit", "Biology.html", &files, &settings).await?;
//! std::fs::write(&deck.name, &deck.apkg)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cloze;
pub mod deck;
pub mod error;
pub mod export;
pub mod files;
pub mod ids;
pub mod input;
pub mod media;
pub mod parser;
pub mod pipeline;
pub mod sanitize;
pub mod settings;
pub mod tags;
pub mod text;

mod dom;

#[cfg(feature = "apkg")]
mod sql;

#[cfg(feature = "apkg")]
mod apkg;

#[cfg(feature = "apkg")]
use std::path::Path;

use serde::Serialize;
#[cfg(feature = "apkg")]
use tracing::info;

pub use deck::{Deck, Note};
pub use error::{Error, Result};
pub use export::Exporter;
pub use files::FileSet;
pub use ids::IdGenerator;
pub use parser::DeckParser;
pub use pipeline::{PIPELINE, Stage, build_decks};
pub use settings::{ExportModels, Settings, ToggleMode};

#[cfg(feature = "apkg")]
pub use apkg::{ApkgExporter, STYLE_FILE};

/// Environment variable naming the directory build workspaces are created in.
pub const WORKSPACE_ENV: &str = "WORKSPACE_BASE";

/// A finished build.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedDeck {
    /// Package file name, `<root deck>.apkg`.
    pub name: String,
    /// Package bytes.
    #[serde(skip)]
    pub apkg: Vec<u8>,
    /// The processed deck tree, root first.
    pub decks: Vec<Deck>,
}

/// Run the card pipeline over a parsed deck tree and export it.
pub async fn export_decks<E: Exporter>(
    parser: DeckParser<'_>,
    settings: &Settings,
    files: &FileSet,
    mut exporter: E,
) -> Result<PreparedDeck> {
    let name = format!("{}.apkg", parser.name());
    let (mut decks, mut ids) = parser.into_parts();
    build_decks(&mut decks, settings, files, &mut exporter, &mut ids)?;
    exporter.configure(&decks);
    let apkg = exporter.save().await?;
    Ok(PreparedDeck { name, apkg, decks })
}

/// Build an `.apkg` from `file_name`, creating the workspace below the
/// directory named by [`WORKSPACE_ENV`].
///
/// Fails with [`Error::MissingWorkspace`] when the variable is unset or
/// empty.
#[cfg(feature = "apkg")]
pub async fn prepare_deck(
    file_name: &str,
    files: &FileSet,
    settings: &Settings,
) -> Result<PreparedDeck> {
    let parser = DeckParser::new(file_name, settings, files)?;
    let base = std::env::var_os(WORKSPACE_ENV)
        .filter(|base| !base.is_empty())
        .ok_or(Error::MissingWorkspace)?;
    build_in_workspace(parser, Path::new(&base), files, settings).await
}

/// Build an `.apkg` from `file_name`, creating the workspace below `base`.
#[cfg(feature = "apkg")]
pub async fn prepare_deck_in(
    base: impl AsRef<Path>,
    file_name: &str,
    files: &FileSet,
    settings: &Settings,
) -> Result<PreparedDeck> {
    let parser = DeckParser::new(file_name, settings, files)?;
    build_in_workspace(parser, base.as_ref(), files, settings).await
}

#[cfg(feature = "apkg")]
async fn build_in_workspace(
    parser: DeckParser<'_>,
    base: &Path,
    files: &FileSet,
    settings: &Settings,
) -> Result<PreparedDeck> {
    let workspace = base.join(uuid::Uuid::new_v4().to_string());
    tokio::fs::create_dir_all(&workspace).await?;
    let style = parser
        .decks()
        .first()
        .map(Deck::clean_style)
        .unwrap_or_default();
    tokio::fs::write(workspace.join(STYLE_FILE), style).await?;
    info!(deck = %parser.name(), workspace = %workspace.display(), "building package");

    let exporter = ApkgExporter::new(parser.name(), &workspace);
    export_decks(parser, settings, files, exporter).await
}
