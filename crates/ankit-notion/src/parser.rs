//! Recursive page-to-deck parsing.
//!
//! A page becomes one [`Deck`]. Toggle lists on the page become its notes,
//! and every `.link-to-page` element is followed depth-first to build the
//! subdecks, named `parent::child`.

use std::sync::LazyLock;

use kuchiki::{ElementData, NodeDataRef};
use regex_lite::Regex;
use tracing::{debug, info, warn};

use crate::deck::{Deck, Note};
use crate::dom::{self, Document};
use crate::error::{Error, Result};
use crate::files::FileSet;
use crate::ids::IdGenerator;
use crate::media::decode_path;
use crate::sanitize::sanitize;
use crate::settings::{Settings, ToggleMode};
use crate::text::replace_all;

const UNDERLINE_STYLE: &str = "border-bottom:0.05em solid";
const PRE_WRAP_STYLE: &str = "white-space: pre-wrap;";
const DEFAULT_FONT_SIZE: &str = "20px";
const CHERRY: &str = "🍒";
const CHERRY_ENTITY: &str = "&#x1F352;";

static NESTED_TOGGLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"<details(.*?)>(.*?)</details>",
        r"<summary>(.*?)</summary>",
        r"<li></li>",
        r"<ul[^/>][^>]*></ul>",
        r"</details></li></ul></details></li></ul>",
        r"</details></li></ul>",
        r"<p[^/>][^>]*></p>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("BUG: hardcoded toggle pattern is invalid"))
    .collect()
});

/// Builds the deck tree of an export, starting from its root page.
///
/// Parsing happens at construction; the result is a flat, depth-first list
/// of decks whose names encode the hierarchy.
#[derive(Debug)]
pub struct DeckParser<'a> {
    settings: &'a Settings,
    files: &'a FileSet,
    file_name: String,
    decks: Vec<Deck>,
    ids: IdGenerator,
}

impl<'a> DeckParser<'a> {
    /// Parse `file_name` and every page reachable from it.
    ///
    /// Fails with [`Error::PageNotFound`] when the root page is not in the
    /// file set.
    pub fn new(file_name: &str, settings: &'a Settings, files: &'a FileSet) -> Result<Self> {
        let contents = files
            .get_html(file_name)
            .ok_or_else(|| Error::PageNotFound(file_name.to_string()))?;

        let mut parser = Self {
            settings,
            files,
            file_name: file_name.to_string(),
            decks: Vec::new(),
            ids: IdGenerator::new(),
        };
        let mut ancestors = vec![file_name.to_string()];
        parser.parse_page(
            &contents,
            settings.deck_name().map(String::from),
            &mut ancestors,
        )?;
        Ok(parser)
    }

    /// Name of the root deck.
    pub fn name(&self) -> &str {
        self.decks
            .first()
            .map(|deck| deck.name.as_str())
            .unwrap_or_default()
    }

    /// The parsed decks, root first.
    pub fn decks(&self) -> &[Deck] {
        &self.decks
    }

    /// Consume the parser, keeping the decks.
    pub fn into_decks(self) -> Vec<Deck> {
        self.decks
    }

    pub(crate) fn into_parts(self) -> (Vec<Deck>, IdGenerator) {
        (self.decks, self.ids)
    }

    fn parse_page(
        &mut self,
        contents: &str,
        deck_name: Option<String>,
        ancestors: &mut Vec<String>,
    ) -> Result<()> {
        let contents = if self.settings.no_underline {
            replace_all(contents, UNDERLINE_STYLE, "")
        } else {
            contents.to_string()
        };
        let document = Document::parse(&contents);

        let mut name = match deck_name {
            Some(name) => name,
            None => document
                .select_first("title")?
                .map(|title| title.as_node().text_contents())
                .unwrap_or_default(),
        };

        let style = document
            .select_first("style")?
            .map(|style| style.as_node().text_contents())
            .filter(|style| !style.is_empty())
            .map(|style| {
                with_font_size(
                    replace_all(&style, PRE_WRAP_STYLE, ""),
                    self.settings.font_size.as_deref(),
                )
            });

        let image = document
            .select_first(".page-cover-image")?
            .and_then(|cover| dom::attr(&cover, "src"));

        if self.decks.is_empty() {
            let icon = document
                .select_first(".page-header-icon > .icon")?
                .map(|icon| dom::inner_html(icon.as_node()))
                .filter(|icon| !icon.is_empty());
            if let Some(icon) = icon {
                name = prefix_icon(&name, &icon);
            }
        }

        let global_tags = document
            .select(".page-body > p > del")?
            .iter()
            .map(|del| del.as_node().text_contents())
            .collect();

        let notes = sanitize(self.extract_notes(&document)?, self.settings);
        let mut deck = Deck::new(name.clone(), notes, image, style, self.ids.next_id());
        deck.global_tags = global_tags;
        info!(deck = %name, cards = deck.cards.len(), "parsed page");
        self.decks.push(deck);

        if name.is_empty() {
            return Ok(());
        }
        for link in document.select(".link-to-page")? {
            self.follow_link(&link, &name, ancestors)?;
        }
        Ok(())
    }

    fn follow_link(
        &mut self,
        link: &NodeDataRef<ElementData>,
        parent: &str,
        ancestors: &mut Vec<String>,
    ) -> Result<()> {
        let anchor = dom::select_first(link.as_node(), "a")?;
        let Some(href) = anchor.as_ref().and_then(|anchor| dom::attr(anchor, "href")) else {
            debug!(file = %self.file_name, deck = %parent, "skipping link without href");
            return Ok(());
        };
        let target = decode_path(&href)?;

        let files = self.files;
        let Some((key, bytes)) = files.find_page(&target) else {
            debug!(file = %self.file_name, target = %target, "skipping missing link target");
            return Ok(());
        };
        if ancestors.iter().any(|ancestor| ancestor == key) {
            warn!(target = %key, deck = %parent, "skipping link back to an ancestor page");
            return Ok(());
        }

        let title = dom::select_first(link.as_node(), "title")?
            .map(|title| title.as_node().text_contents())
            .filter(|title| !title.is_empty())
            .or_else(|| anchor.map(|anchor| anchor.as_node().text_contents()))
            .unwrap_or_default();
        let child = format!("{}::{}", parent, title);
        let contents = String::from_utf8_lossy(bytes).into_owned();

        ancestors.push(key.to_string());
        let result = self.parse_page(&contents, Some(child), ancestors);
        ancestors.pop();
        result
    }

    fn extract_notes(&self, document: &Document) -> Result<Vec<Note>> {
        let selector = if self.settings.selects_all_toggles() {
            ".toggle"
        } else {
            ".page-body > ul"
        };

        let mut notes = Vec::new();
        for candidate in document.select(selector)? {
            let class = dom::attr(&candidate, "class").unwrap_or_default();
            let details = document.select("details")?;
            match self.settings.toggle_mode {
                ToggleMode::OpenToggle => {
                    for element in &details {
                        element.attributes.borrow_mut().insert("open", String::new());
                    }
                }
                ToggleMode::CloseToggle => {
                    for element in &details {
                        element.attributes.borrow_mut().remove("open");
                    }
                }
                ToggleMode::Unset => {}
            }
            for element in details.iter().chain(document.select("summary")?.iter()) {
                dom::add_class(element, &class);
            }

            if let Some(note) = self.extract_note(&candidate, &class)? {
                notes.push(note);
            }
        }
        Ok(notes)
    }

    fn extract_note(
        &self,
        candidate: &NodeDataRef<ElementData>,
        class: &str,
    ) -> Result<Option<Note>> {
        let Some(summary) = dom::select_first(candidate.as_node(), "summary")? else {
            return Ok(None);
        };
        if summary.as_node().text_contents().is_empty() {
            return Ok(None);
        }
        let Some(details) = dom::select_first(candidate.as_node(), "details")? else {
            return Ok(None);
        };
        let details_html = dom::inner_html(details.as_node());
        if details_html.is_empty() {
            return Ok(None);
        }

        let summary_html = dom::inner_html(summary.as_node());
        let front = if class.is_empty() {
            summary_html
        } else {
            format!("<div class='{}'>{}</div>", class, summary_html)
        };

        let mut back = details_html.replacen(&dom::outer_html(summary.as_node()), "", 1);
        if self.settings.is_text_only_back {
            back = details
                .as_node()
                .children()
                .filter(|child| {
                    child
                        .as_element()
                        .is_some_and(|element| &*element.name.local == "p")
                })
                .map(|paragraph| dom::inner_html(&paragraph))
                .collect();
        }
        if self.settings.max_one {
            back = remove_nested_toggles(&back);
        }

        let note = Note::new(front, back);
        if self.settings.is_cherry && !has_cherry(&note) {
            debug!(front = %note.front, "note has no cherry marker");
        }
        Ok(Some(note))
    }
}

/// Strip nested toggles and the empty containers they leave behind.
fn remove_nested_toggles(back: &str) -> String {
    NESTED_TOGGLE_PATTERNS
        .iter()
        .fold(back.to_string(), |text, pattern| {
            pattern.replace_all(&text, "").into_owned()
        })
}

/// Append a font-size rule, unless the size is the export default.
fn with_font_size(style: String, font_size: Option<&str>) -> String {
    match font_size {
        Some(size) if !size.is_empty() && size != DEFAULT_FONT_SIZE => {
            let size = if size.trim().ends_with("px") {
                size.to_string()
            } else {
                format!("{}px", size)
            };
            format!("{}\n* {{ font-size:{}}}", style, size)
        }
        _ => style,
    }
}

/// Put the page icon in front of the last segment of a deck name.
fn prefix_icon(name: &str, icon: &str) -> String {
    if name.contains(icon) {
        return name.to_string();
    }
    if !name.contains("::") {
        return format!("{} {}", icon, name);
    }
    let mut segments: Vec<String> = name.split("::").map(String::from).collect();
    if let Some(last) = segments.last_mut() {
        *last = format!("{} {}", icon, last);
    }
    segments.join("::")
}

fn has_cherry(note: &Note) -> bool {
    [CHERRY, CHERRY_ENTITY]
        .iter()
        .any(|marker| note.front.contains(marker) || note.back.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, head: &str, body: &str) -> String {
        format!(
            r#"<html><head><title>{title}</title>{head}</head><body><article><header>{title}</header><div class="page-body">{body}</div></article></body></html>"#
        )
    }

    fn toggle(summary: &str, details: &str) -> String {
        format!(
            r#"<ul class="toggle"><li><details open=""><summary>{summary}</summary>{details}</details></li></ul>"#
        )
    }

    fn link(href: &str, text: &str) -> String {
        format!(r#"<figure class="link-to-page"><a href="{href}">{text}</a></figure>"#)
    }

    fn parse(settings: &Settings, files: &FileSet) -> Vec<Deck> {
        DeckParser::new("Root.html", settings, files)
            .unwrap()
            .into_decks()
    }

    #[test]
    fn test_single_flat_toggle() {
        let files = FileSet::from_iter([(
            "Root.html",
            page("Root", "", &toggle("Q1", "<p>A1</p>")),
        )]);
        let decks = parse(&Settings::default(), &files);

        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].name, "Root");
        assert_eq!(decks[0].cards.len(), 1);
        assert_eq!(decks[0].cards[0].front, "<div class='toggle'>Q1</div>");
        assert_eq!(decks[0].cards[0].back, "<p>A1</p>");
    }

    #[test]
    fn test_empty_toggles_are_dropped() {
        let body = format!(
            "{}{}{}",
            toggle("", "<p>A</p>"),
            toggle("Q", ""),
            toggle("Kept", "<p>A</p>")
        );
        let files = FileSet::from_iter([("Root.html", page("Root", "", &body))]);
        let decks = parse(&Settings::default(), &files);
        assert_eq!(decks[0].cards.len(), 1);
        assert!(decks[0].cards[0].front.contains("Kept"));
    }

    #[test]
    fn test_subpages_become_subdecks() {
        let root_body = format!(
            "{}{}",
            link("Root/Chapter1%20abc.html", "Chapter1"),
            link("Root/Chapter2%20def.html", "Chapter2")
        );
        let files = FileSet::from_iter([
            ("Root.html", page("Root", "", &root_body)),
            ("Root/Chapter1 abc.html", page("Chapter1", "", "")),
            ("Root/Chapter2 def.html", page("Chapter2", "", "")),
        ]);
        let decks = parse(&Settings::default(), &files);

        let names: Vec<_> = decks.iter().map(|deck| deck.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Root::Chapter1", "Root::Chapter2"]);
        let mut ids: Vec<_> = decks.iter().map(|deck| deck.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_missing_link_is_skipped() {
        let root_body = format!(
            "{}{}{}",
            link("Nowhere.html", "Gone"),
            r#"<figure class="link-to-page"><span>no anchor</span></figure>"#,
            link("Child.html", "Child")
        );
        let files = FileSet::from_iter([
            ("Root.html", page("Root", "", &root_body)),
            ("Child.html", page("Child", "", "")),
        ]);
        let decks = parse(&Settings::default(), &files);
        let names: Vec<_> = decks.iter().map(|deck| deck.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Root::Child"]);
    }

    #[test]
    fn test_link_cycle_is_cut() {
        let files = FileSet::from_iter([
            ("Root.html", page("Root", "", &link("Child.html", "Child"))),
            ("Child.html", page("Child", "", &link("Root.html", "Root"))),
        ]);
        let decks = parse(&Settings::default(), &files);
        let names: Vec<_> = decks.iter().map(|deck| deck.name.as_str()).collect();
        assert_eq!(names, vec!["Root", "Root::Child"]);
    }

    #[test]
    fn test_missing_root_page() {
        let files = FileSet::new();
        let settings = Settings::default();
        let result = DeckParser::new("Root.html", &settings, &files);
        assert!(matches!(result, Err(Error::PageNotFound(name)) if name == "Root.html"));
    }

    #[test]
    fn test_override_name_and_icon() {
        let icon = r#"<div class="page-header-icon"><span class="icon">🍎</span></div>"#;
        let files = FileSet::from_iter([
            (
                "Root.html",
                page("Root", "", &format!("{}{}", icon, link("Child.html", "Child"))),
            ),
            ("Child.html", page("Child", "", icon)),
        ]);

        let decks = parse(&Settings::default(), &files);
        assert_eq!(decks[0].name, "🍎 Root");
        assert_eq!(decks[1].name, "🍎 Root::Child");

        let settings = Settings {
            deck_name: Some("Lang::French".to_string()),
            ..Default::default()
        };
        let decks = parse(&settings, &files);
        assert_eq!(decks[0].name, "Lang::🍎 French");
    }

    #[test]
    fn test_prefix_icon() {
        assert_eq!(prefix_icon("Root", "🍎"), "🍎 Root");
        assert_eq!(prefix_icon("🍎 Root", "🍎"), "🍎 Root");
        assert_eq!(prefix_icon("A::B::C", "🍎"), "A::B::🍎 C");
    }

    #[test]
    fn test_style_and_cover() {
        let head = "<style>p { white-space: pre-wrap; color: red; }</style>";
        let body = r#"<img class="page-cover-image" src="Root/cover.png">"#;
        let files = FileSet::from_iter([("Root.html", page("Root", head, body))]);

        let decks = parse(&Settings::default(), &files);
        assert_eq!(decks[0].style.as_deref(), Some("p {  color: red; }"));
        assert_eq!(decks[0].image.as_deref(), Some("Root/cover.png"));

        let settings = Settings {
            font_size: Some("24".to_string()),
            ..Default::default()
        };
        let decks = parse(&settings, &files);
        assert_eq!(
            decks[0].style.as_deref(),
            Some("p {  color: red; }\n* { font-size:24px}")
        );
    }

    #[test]
    fn test_with_font_size() {
        assert_eq!(with_font_size("a".into(), None), "a");
        assert_eq!(with_font_size("a".into(), Some("20px")), "a");
        assert_eq!(with_font_size("a".into(), Some("")), "a");
        assert_eq!(with_font_size("a".into(), Some("18px")), "a\n* { font-size:18px}");
        assert_eq!(with_font_size("a".into(), Some("32")), "a\n* { font-size:32px}");
    }

    #[test]
    fn test_global_tags_are_captured() {
        let body = format!(
            "<p><del>lang, french verbs</del></p>{}",
            toggle("Q", "<p>A</p>")
        );
        let files = FileSet::from_iter([("Root.html", page("Root", "", &body))]);
        let decks = parse(&Settings::default(), &files);
        assert_eq!(decks[0].global_tags, vec!["lang, french verbs".to_string()]);
    }

    #[test]
    fn test_text_only_back() {
        let files = FileSet::from_iter([(
            "Root.html",
            page(
                "Root",
                "",
                &toggle("Q", "<p>A</p><ul><li>x</li></ul><p>B</p>"),
            ),
        )]);
        let settings = Settings {
            is_text_only_back: true,
            ..Default::default()
        };
        let decks = parse(&settings, &files);
        assert_eq!(decks[0].cards[0].back, "AB");
    }

    #[test]
    fn test_max_one_strips_nested_toggles() {
        assert_eq!(
            remove_nested_toggles(
                r#"<p>A</p><ul class="toggle"><li><details><summary>Inner</summary><p>x</p></details></li></ul>"#
            ),
            "<p>A</p>"
        );
        assert_eq!(remove_nested_toggles("<p>A</p><li></li>"), "<p>A</p>");
        assert_eq!(
            remove_nested_toggles("<p>A</p><details><summary>Inner</summary><pre>x\ny</pre></details>"),
            "<p>A</p><details><pre>x\ny</pre></details>"
        );
    }

    #[test]
    fn test_untitled_page_has_no_subdecks() {
        let files = FileSet::from_iter([
            ("Root.html", page("", "", &link("Child.html", "Child"))),
            ("Child.html", page("Child", "", "")),
        ]);
        let decks = parse(&Settings::default(), &files);
        assert_eq!(decks.len(), 1);
        assert_eq!(decks[0].name, "");
    }

    #[test]
    fn test_link_text_is_kept_verbatim() {
        let files = FileSet::from_iter([
            ("Root.html", page("Root", "", &link("Child.html", " Child "))),
            ("Child.html", page("Child", "", "")),
        ]);
        let decks = parse(&Settings::default(), &files);
        assert_eq!(decks[1].name, "Root:: Child ");
    }

    #[test]
    fn test_toggle_mode() {
        let nested = r#"<p>A</p><ul class="toggle"><li><details open=""><summary>N</summary><p>n</p></details></li></ul>"#;
        let files = FileSet::from_iter([("Root.html", page("Root", "", &toggle("Q", nested)))]);

        let closed = Settings {
            toggle_mode: ToggleMode::CloseToggle,
            ..Default::default()
        };
        let decks = parse(&closed, &files);
        assert!(!decks[0].cards[0].back.contains("open"));

        let plain = "<p>A</p><ul class=\"toggle\"><li><details><summary>N</summary><p>n</p></details></li></ul>";
        let files = FileSet::from_iter([("Root.html", page("Root", "", &toggle("Q", plain)))]);
        let open = Settings {
            toggle_mode: ToggleMode::OpenToggle,
            ..Default::default()
        };
        let decks = parse(&open, &files);
        assert!(decks[0].cards[0].back.contains(r#"open="""#));
    }

    #[test]
    fn test_all_mode_selects_every_toggle() {
        let body = format!(
            r#"<div>{}</div>{}"#,
            toggle("Deep", "<p>d</p>"),
            toggle("Top", "<p>t</p>")
        );
        let files = FileSet::from_iter([("Root.html", page("Root", "", &body))]);

        let decks = parse(&Settings::default(), &files);
        assert_eq!(decks[0].cards.len(), 1);

        let all = Settings {
            is_all: true,
            ..Default::default()
        };
        let decks = parse(&all, &files);
        assert_eq!(decks[0].cards.len(), 2);
    }

    #[test]
    fn test_no_underline() {
        let head = "<style>.u { border-bottom:0.05em solid; }</style>";
        let files = FileSet::from_iter([("Root.html", page("Root", head, ""))]);
        let settings = Settings {
            no_underline: true,
            ..Default::default()
        };
        let decks = parse(&settings, &files);
        assert_eq!(decks[0].style.as_deref(), Some(".u { ; }"));
    }

    #[test]
    fn test_cherry_marker() {
        assert!(has_cherry(&Note::new("🍒 Q", "")));
        assert!(has_cherry(&Note::new("Q", "&#x1F352;")));
        assert!(!has_cherry(&Note::new("Q", "A")));
    }
}
