//! Common test utilities for ankit-notion integration tests.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use rusqlite::Connection;
use tempfile::TempDir;
use zip::ZipArchive;

/// A page shaped like a Notion HTML export.
pub fn page(title: &str, head: &str, body: &str) -> String {
    format!(
        r#"<html><head><meta charset="utf-8"/><title>{title}</title>{head}</head><body><article class="page"><header><h1 class="page-title">{title}</h1></header><div class="page-body">{body}</div></article></body></html>"#
    )
}

/// A top-level toggle list item.
pub fn toggle(summary: &str, details: &str) -> String {
    format!(
        r#"<ul class="toggle"><li><details open=""><summary>{summary}</summary>{details}</details></li></ul>"#
    )
}

/// A link to a subpage.
pub fn link(href: &str, title: &str) -> String {
    format!(
        r#"<figure class="link-to-page"><a href="{href}">{title}</a></figure>"#
    )
}

/// Extract `collection.anki2` from package bytes and open it.
///
/// The returned directory must outlive the connection.
pub fn open_apkg_database(apkg: &[u8]) -> (TempDir, Connection) {
    let mut archive = ZipArchive::new(Cursor::new(apkg)).unwrap();
    let mut db_file = archive.by_name("collection.anki2").unwrap();
    let mut db_bytes = Vec::new();
    db_file.read_to_end(&mut db_bytes).unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("collection.anki2");
    std::fs::write(&db_path, &db_bytes).unwrap();
    let conn = Connection::open(&db_path).unwrap();
    (temp_dir, conn)
}

/// The media manifest of a package.
pub fn media_manifest(apkg: &[u8]) -> HashMap<String, String> {
    let mut archive = ZipArchive::new(Cursor::new(apkg)).unwrap();
    let mut media_file = archive.by_name("media").unwrap();
    let mut content = String::new();
    media_file.read_to_string(&mut content).unwrap();
    serde_json::from_str(&content).unwrap()
}

/// A numbered media entry of a package.
#[allow(dead_code)]
pub fn media_entry(apkg: &[u8], index: usize) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(apkg)).unwrap();
    let mut entry = archive.by_name(&index.to_string()).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}
