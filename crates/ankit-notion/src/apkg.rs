//! `.apkg` package writer.
//!
//! Writes the deck tree into an Anki collection inside the build workspace
//! and zips it, together with the registered media, in memory.

use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex_lite::Regex;
use rusqlite::Connection;
use serde_json::{Value, json};
use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::deck::{Deck, Note};
use crate::error::Result;
use crate::export::Exporter;
use crate::input::INPUT_PLACEHOLDER;
use crate::settings::ExportModels;
use crate::sql::{
    DEFAULT_CONF, DEFAULT_DCONF, FIELD_SEPARATOR, INSERT_CARD, INSERT_COLLECTION, INSERT_NOTE,
    LATEX_POST, LATEX_PRE, MODEL_CLOZE, MODEL_STANDARD, SCHEMA,
};

/// Name of the stylesheet the build writes into the workspace.
pub const STYLE_FILE: &str = "deck_style.css";

const COLLECTION_FILE: &str = "collection.anki2";
const NO_STYLE_TEMPLATE: &str = "nostyle";
const DEFAULT_BASIC_MODEL: &str = "ankit-notion basic";
const DEFAULT_CLOZE_MODEL: &str = "ankit-notion cloze";
const DEFAULT_INPUT_MODEL: &str = "ankit-notion input";

static CLOZE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{c(\d+)::").expect("BUG: hardcoded cloze pattern is invalid")
});

/// The note type a card is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NoteKind {
    Basic,
    Cloze,
    Input,
}

impl NoteKind {
    fn of(note: &Note) -> Self {
        if note.cloze && CLOZE_NUMBER.is_match(&note.front) {
            NoteKind::Cloze
        } else if note.enable_input && note.answer.is_some() {
            NoteKind::Input
        } else {
            NoteKind::Basic
        }
    }

    fn fields(self) -> &'static [&'static str] {
        match self {
            NoteKind::Basic => &["Front", "Back"],
            NoteKind::Cloze => &["Text", "Extra"],
            NoteKind::Input => &["Front", "Back", "Input"],
        }
    }

    fn template(self) -> (&'static str, &'static str) {
        match self {
            NoteKind::Basic => ("{{Front}}", "{{FrontSide}}\n\n<hr id=answer>\n\n{{Back}}"),
            NoteKind::Cloze => ("{{cloze:Text}}", "{{cloze:Text}}<br>\n{{Extra}}"),
            NoteKind::Input => (
                "{{Front}}\n\n{{type:Input}}",
                "{{Front}}\n\n<hr id=answer>\n\n{{type:Input}}\n\n{{Back}}",
            ),
        }
    }

    /// Field values of `note` in field order.
    fn values(self, note: &Note) -> Vec<String> {
        match self {
            NoteKind::Basic | NoteKind::Cloze => vec![note.front.clone(), note.back.clone()],
            NoteKind::Input => vec![
                note.front.replace(INPUT_PLACEHOLDER, ""),
                note.back.clone(),
                note.answer.clone().unwrap_or_default(),
            ],
        }
    }

    /// Template ordinals the note produces cards for.
    fn ordinals(self, note: &Note) -> Vec<i64> {
        match self {
            NoteKind::Cloze => cloze_numbers(&note.front)
                .into_iter()
                .map(|number| i64::from(number) - 1)
                .collect(),
            _ => vec![0],
        }
    }
}

/// Resolved name and id of one note type.
#[derive(Debug, Clone)]
struct Model {
    id: i64,
    name: String,
}

/// Writes decks and media as an Anki package.
#[derive(Debug)]
pub struct ApkgExporter {
    deck_name: String,
    workspace: PathBuf,
    media: Vec<(String, Vec<u8>)>,
    decks: Vec<Deck>,
}

impl ApkgExporter {
    /// Create an exporter for the deck tree rooted at `deck_name`, using
    /// `workspace` as its scratch directory.
    pub fn new(deck_name: impl Into<String>, workspace: impl AsRef<Path>) -> Self {
        Self {
            deck_name: deck_name.into(),
            workspace: workspace.as_ref().to_path_buf(),
            media: Vec::new(),
            decks: Vec::new(),
        }
    }

    /// Write the collection and return the zipped package.
    pub fn write_package(&self) -> Result<Vec<u8>> {
        let db_path = self.workspace.join(COLLECTION_FILE);
        if db_path.exists() {
            std::fs::remove_file(&db_path)?;
        }
        {
            let conn = Connection::open(&db_path)?;
            self.create_database(&conn)?;
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file(COLLECTION_FILE, options)?;
        zip.write_all(&std::fs::read(&db_path)?)?;

        zip.start_file("media", options)?;
        zip.write_all(self.build_media_manifest()?.as_bytes())?;

        for (index, (_, bytes)) in self.media.iter().enumerate() {
            zip.start_file(index.to_string(), options)?;
            zip.write_all(bytes)?;
        }

        let bytes = zip.finish()?.into_inner();
        info!(deck = %self.deck_name, size = bytes.len(), media = self.media.len(), "wrote package");
        Ok(bytes)
    }

    fn create_database(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA)?;

        let now = current_timestamp();
        let now_ms = now * 1000;
        let models = self.resolve_models();

        conn.execute(
            INSERT_COLLECTION,
            rusqlite::params![
                now,
                now_ms,
                DEFAULT_CONF,
                self.build_models_json(&models, now)?,
                self.build_decks_json(now)?,
                DEFAULT_DCONF
            ],
        )?;

        let mut note_id = now_ms;
        let mut card_id = now_ms;
        for deck in &self.decks {
            for note in &deck.cards {
                let kind = NoteKind::of(note);
                let model = &models[&kind];
                let values = kind.values(note);
                let sort_field = values.first().cloned().unwrap_or_default();

                conn.execute(
                    INSERT_NOTE,
                    rusqlite::params![
                        note_id,
                        generate_guid(note_id),
                        model.id,
                        now,
                        tags_string(&note.tags),
                        values.join(&FIELD_SEPARATOR.to_string()),
                        sort_field,
                        compute_checksum(&sort_field)
                    ],
                )?;

                for ord in kind.ordinals(note) {
                    conn.execute(
                        INSERT_CARD,
                        rusqlite::params![card_id, note_id, deck.id, ord, now, note.number as i64],
                    )?;
                    card_id += 1;
                }
                note_id += 1;
            }
            debug!(deck = %deck.name, cards = deck.cards.len(), "wrote deck");
        }
        Ok(())
    }

    fn root_models(&self) -> ExportModels {
        self.decks
            .first()
            .and_then(|deck| deck.models.clone())
            .unwrap_or_default()
    }

    fn resolve_models(&self) -> HashMap<NoteKind, Model> {
        let settings = self.root_models();
        let resolve = |name: Option<String>, id: Option<i64>, default: &str| {
            let name = name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| default.to_string());
            let id = id.unwrap_or_else(|| generate_id(&name));
            Model { id, name }
        };
        HashMap::from([
            (
                NoteKind::Basic,
                resolve(settings.basic_model_name, settings.basic_model_id, DEFAULT_BASIC_MODEL),
            ),
            (
                NoteKind::Cloze,
                resolve(settings.cloze_model_name, settings.cloze_model_id, DEFAULT_CLOZE_MODEL),
            ),
            (
                NoteKind::Input,
                resolve(settings.input_model_name, settings.input_model_id, DEFAULT_INPUT_MODEL),
            ),
        ])
    }

    /// Card CSS: the workspace stylesheet unless the template opts out.
    fn card_css(&self) -> String {
        if self.root_models().template.as_deref() == Some(NO_STYLE_TEMPLATE) {
            return default_css();
        }
        std::fs::read_to_string(self.workspace.join(STYLE_FILE))
            .ok()
            .filter(|css| !css.trim().is_empty())
            .unwrap_or_else(default_css)
    }

    fn build_models_json(&self, models: &HashMap<NoteKind, Model>, now: i64) -> Result<String> {
        let css = self.card_css();
        let mut json_models: HashMap<String, Value> = HashMap::new();

        for (kind, model) in models {
            let fields: Vec<Value> = kind
                .fields()
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    json!({
                        "name": name,
                        "ord": i,
                        "sticky": false,
                        "rtl": false,
                        "font": "Arial",
                        "size": 20,
                        "media": []
                    })
                })
                .collect();

            let (front, back) = kind.template();
            let (template_name, model_type) = if *kind == NoteKind::Cloze {
                ("Cloze", MODEL_CLOZE)
            } else {
                ("Card 1", MODEL_STANDARD)
            };
            let template = json!({
                "name": template_name,
                "ord": 0,
                "qfmt": front,
                "afmt": back,
                "bqfmt": "",
                "bafmt": "",
                "did": null,
                "bfont": "",
                "bsize": 0
            });

            json_models.insert(
                model.id.to_string(),
                json!({
                    "id": model.id,
                    "name": model.name,
                    "type": model_type,
                    "mod": now,
                    "usn": -1,
                    "sortf": 0,
                    "did": null,
                    "tmpls": [template],
                    "flds": fields,
                    "css": css,
                    "latexPre": LATEX_PRE,
                    "latexPost": LATEX_POST,
                    "latexsvg": false,
                    "req": [build_requirement(front, kind.fields())]
                }),
            );
        }

        Ok(serde_json::to_string(&json_models)?)
    }

    fn build_decks_json(&self, now: i64) -> Result<String> {
        let mut decks: HashMap<String, Value> = HashMap::new();
        decks.insert("1".to_string(), deck_json(1, "Default", "", now));
        for deck in &self.decks {
            decks.insert(
                deck.id.to_string(),
                deck_json(deck.id, &deck.name, &deck_description(deck), now),
            );
        }
        Ok(serde_json::to_string(&decks)?)
    }

    fn build_media_manifest(&self) -> Result<String> {
        let manifest: HashMap<String, &str> = self
            .media
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (i.to_string(), name.as_str()))
            .collect();
        Ok(serde_json::to_string(&manifest)?)
    }
}

impl Exporter for ApkgExporter {
    fn add_media(&mut self, name: &str, bytes: &[u8]) {
        if self.media.iter().any(|(existing, _)| existing == name) {
            return;
        }
        self.media.push((name.to_string(), bytes.to_vec()));
    }

    fn configure(&mut self, decks: &[Deck]) {
        self.decks = decks.to_vec();
    }

    async fn save(self) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || self.write_package()).await?
    }
}

fn deck_json(id: i64, name: &str, description: &str, now: i64) -> Value {
    json!({
        "id": id,
        "mod": now,
        "name": name,
        "usn": -1,
        "lrnToday": [0, 0],
        "revToday": [0, 0],
        "newToday": [0, 0],
        "timeToday": [0, 0],
        "collapsed": false,
        "browserCollapsed": false,
        "desc": description,
        "dyn": 0,
        "conf": 1,
        "extendNew": 10,
        "extendRev": 50
    })
}

/// Deck description: the cover image, unless descriptions are disabled.
fn deck_description(deck: &Deck) -> String {
    if deck.empty_description {
        return String::new();
    }
    deck.image
        .as_deref()
        .map(|image| format!("<img src=\"{}\" />", image))
        .unwrap_or_default()
}

/// Distinct cloze numbers in `text`, ascending.
fn cloze_numbers(text: &str) -> BTreeSet<u32> {
    CLOZE_NUMBER
        .captures_iter(text)
        .filter_map(|captures| captures.get(1)?.as_str().parse().ok())
        .filter(|number| *number > 0)
        .collect()
}

/// Anki's space-delimited tag column.
fn tags_string(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(" {} ", tags.join(" "))
    }
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

/// Generate a stable ID from a string (for models).
fn generate_id(name: &str) -> i64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    (hasher.finish() & 0x7FFF_FFFF_FFFF) as i64
}

/// Base91 note GUID, as Anki writes them.
fn generate_guid(note_id: i64) -> String {
    const CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+,-./:;<=>?@[]^_`{|}~";
    let mut n = note_id as u64;
    let mut result = String::new();
    while n > 0 {
        result.push(CHARS[(n % 91) as usize] as char);
        n /= 91;
    }
    result
}

fn compute_checksum(sort_field: &str) -> i64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    strip_html(sort_field).hash(&mut hasher);
    (hasher.finish() & 0xFFFF_FFFF) as i64
}

fn strip_html(s: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Fields the front template needs to render a card.
fn build_requirement(front: &str, fields: &[&str]) -> Value {
    let referenced: Vec<usize> = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| front.contains(&format!("{{{{{}}}}}", field)))
        .map(|(i, _)| i)
        .collect();
    if referenced.is_empty() {
        json!([0, "any", [0]])
    } else {
        json!([0, "any", referenced])
    }
}

fn default_css() -> String {
    r#".card {
    font-family: arial;
    font-size: 20px;
    text-align: center;
    color: black;
    background-color: white;
}"#
    .to_string()
}
