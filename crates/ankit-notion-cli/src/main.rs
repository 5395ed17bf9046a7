//! Convert a Notion-style HTML export into an Anki package.

use std::path::{Path, PathBuf};

use ankit_notion::{FileSet, Settings, WORKSPACE_ENV, prepare_deck, prepare_deck_in};
use clap::Parser;
use tracing::{debug, info};

/// Convert a Notion-style HTML export into an Anki package.
#[derive(Parser, Debug)]
#[command(name = "ankit-notion")]
#[command(version, about, long_about = None)]
struct Args {
    /// Export directory, `.zip` archive, or a single HTML page
    input: PathBuf,

    /// Root page within the export (defaults to the first top-level HTML page)
    #[arg(long)]
    root: Option<String>,

    /// TOML settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory the package is written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Directory build workspaces are created in
    #[arg(long, env = WORKSPACE_ENV)]
    workspace: Option<PathBuf>,

    /// Print the processed deck tree as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Load the file set and the default root page for `input`.
fn load_files(input: &Path) -> Result<(FileSet, Option<String>), Box<dyn std::error::Error>> {
    if input.is_dir() {
        return Ok((FileSet::from_dir(input)?, None));
    }

    let is_zip = input
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("zip"));
    if is_zip {
        return Ok((FileSet::from_zip(&std::fs::read(input)?)?, None));
    }

    let parent = input
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let root = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    Ok((FileSet::from_dir(parent)?, root))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &args.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    debug!(?settings, "loaded settings");

    let (files, detected_root) = load_files(&args.input)?;
    let root = args
        .root
        .or(detected_root)
        .or_else(|| files.root_page().map(String::from))
        .ok_or("no top-level HTML page found in the export")?;
    info!(root = %root, files = files.len(), "loaded export");

    let prepared = match &args.workspace {
        Some(base) => prepare_deck_in(base, &root, &files, &settings).await?,
        None => prepare_deck(&root, &files, &settings).await?,
    };

    std::fs::create_dir_all(&args.output)?;
    let path = args.output.join(&prepared.name);
    std::fs::write(&path, &prepared.apkg)?;
    info!(path = %path.display(), decks = prepared.decks.len(), "wrote package");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prepared)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}
