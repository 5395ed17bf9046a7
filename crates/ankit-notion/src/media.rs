//! Media resolution and rich-media embedding for card backs.

use std::sync::LazyLock;

use regex_lite::Regex;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::deck::Note;
use crate::dom::{self, Fragment};
use crate::error::{Error, Result};
use crate::export::Exporter;
use crate::files::FileSet;
use crate::text;

static SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.[0-9a-z]+$").expect("BUG: hardcoded suffix pattern is invalid")
});

/// The file suffix of `path`, including the dot.
pub fn suffix(path: &str) -> Option<&str> {
    SUFFIX.find(path).map(|m| m.as_str())
}

/// Deterministic, collision-resistant media name for a relative path.
pub fn unique_file_name(path: &str) -> String {
    hex::encode(Sha1::digest(path.as_bytes()))
}

/// Decode a percent-encoded reference.
pub fn decode_path(encoded: &str) -> Result<String> {
    urlencoding::decode(encoded)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::InvalidPath(encoded.to_string()))
}

/// Resolves relative media references against the file set and registers
/// them with the exporter.
pub struct MediaResolver<'a, E: Exporter> {
    files: &'a FileSet,
    exporter: &'a mut E,
    root_name: &'a str,
}

impl<'a, E: Exporter> MediaResolver<'a, E> {
    /// Create a resolver; `root_name` prefixes the fallback lookup.
    pub fn new(files: &'a FileSet, exporter: &'a mut E, root_name: &'a str) -> Self {
        Self {
            files,
            exporter,
            root_name,
        }
    }

    /// Look up `path`, register it and return its new name.
    ///
    /// Returns `None` when the path has no recognisable suffix or is not in
    /// the file set.
    pub fn embed(&mut self, path: &str) -> Option<String> {
        let suffix = suffix(path)?;
        let files = self.files;
        let contents = match files.get(path) {
            Some(contents) => contents,
            None => {
                let lookup = fallback_path(self.root_name, path);
                match files.get(&lookup) {
                    Some(contents) => contents,
                    None => {
                        warn!(path = %path, root = %self.root_name, "missing relative media path");
                        return None;
                    }
                }
            }
        };
        let new_name = format!("{}{}", unique_file_name(path), suffix);
        self.exporter.add_media(&new_name, contents);
        Some(new_name)
    }

    /// Resolve images, audio links and video embeds in the back of `note`.
    ///
    /// Returns the number of `<img>` tags in the original back text.
    pub fn process_back(&mut self, note: &mut Note) -> Result<usize> {
        if note.back.is_empty() {
            return Ok(0);
        }

        let mut image_count = 0;
        let fragment = Fragment::parse(&note.back);
        let images = fragment.select("img")?;
        if !images.is_empty() {
            for image in &images {
                let Some(source) = dom::attr(image, "src") else {
                    continue;
                };
                if source.starts_with("http") {
                    continue;
                }
                if let Some(new_name) = self.embed(&decode_path(&source)?) {
                    image.attributes.borrow_mut().insert("src", new_name.clone());
                    note.media.push(new_name);
                }
            }
            image_count = text::count_images(&note.back);
            note.back = fragment.to_html();
        }

        if let Some(audio) = text::mp3_link(&note.back) {
            if let Some(new_name) = self.embed(&decode_path(&audio)?) {
                note.back.push_str(&format!("[sound:{}]", new_name));
                note.media.push(new_name);
            }
        }

        if let Some(id) = text::youtube_id(&note.back) {
            debug!(id = %id, "embedding YouTube video");
            note.back.push_str(&text::youtube_embed(&id));
        }

        if let Some(url) = text::soundcloud_url(&note.back) {
            debug!(url = %url, "embedding SoundCloud track");
            note.back.push_str(&text::soundcloud_embed(&url));
        }

        Ok(image_count)
    }
}

/// `root/path` with parent and current directory segments removed.
fn fallback_path(root: &str, path: &str) -> String {
    format!("{}/{}", root, path)
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::testing::RecordingExporter;

    fn files() -> FileSet {
        FileSet::from_iter([
            ("Root/img/photo.png", b"png-bytes".to_vec()),
            ("direct.JPG", b"jpg-bytes".to_vec()),
            ("Root/audio/clip.mp3", b"mp3-bytes".to_vec()),
            ("Root/my file.png", b"spaced".to_vec()),
        ])
    }

    #[test]
    fn test_suffix() {
        assert_eq!(suffix("img/photo.png"), Some(".png"));
        assert_eq!(suffix("a.tar.GZ"), Some(".GZ"));
        assert_eq!(suffix("README"), None);
        assert_eq!(suffix("img/photo.png?x=1"), None);
    }

    #[test]
    fn test_unique_file_name_is_sha1() {
        assert_eq!(unique_file_name("abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_fallback_path() {
        assert_eq!(fallback_path("Root", "./img/photo.png"), "Root/img/photo.png");
        assert_eq!(fallback_path("Root", "../Root/img/a.png"), "Root/Root/img/a.png");
        assert_eq!(fallback_path("Root", "img/a.png"), "Root/img/a.png");
    }

    #[test]
    fn test_embed_direct_and_fallback() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");

        let direct = resolver.embed("direct.JPG").unwrap();
        assert!(direct.ends_with(".JPG"));

        let fallback = resolver.embed("./img/photo.png").unwrap();
        assert_eq!(fallback, format!("{}.png", unique_file_name("./img/photo.png")));

        assert_eq!(resolver.embed("missing.png"), None);
        assert_eq!(resolver.embed("Root/img/no-suffix"), None);

        assert_eq!(exporter.media.len(), 2);
        assert_eq!(exporter.media[1].1, b"png-bytes");
    }

    #[test]
    fn test_embed_is_deterministic() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");
        let first = resolver.embed("./img/photo.png").unwrap();
        let second = resolver.embed("./img/photo.png").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_process_back_rewrites_images() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");

        let mut note = Note::new(
            "Q",
            r#"<p><img src="./img/photo.png"></p><img src="https://x.org/a.png"><img src="gone.png">"#,
        );
        let count = resolver.process_back(&mut note).unwrap();

        let new_name = format!("{}.png", unique_file_name("./img/photo.png"));
        assert_eq!(count, 3);
        assert_eq!(note.media, vec![new_name.clone()]);
        assert!(note.back.contains(&format!(r#"<img src="{}">"#, new_name)));
        assert!(note.back.contains(r#"<img src="https://x.org/a.png">"#));
        assert!(note.back.contains(r#"<img src="gone.png">"#));
    }

    #[test]
    fn test_process_back_keeps_leading_style() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");

        let mut note = Note::new(
            "Q",
            r#"<style>.k{color:red}</style><p><img src="./img/photo.png"></p>"#,
        );
        resolver.process_back(&mut note).unwrap();

        let new_name = format!("{}.png", unique_file_name("./img/photo.png"));
        assert_eq!(
            note.back,
            format!(r#"<style>.k{{color:red}}</style><p><img src="{}"></p>"#, new_name)
        );
    }

    #[test]
    fn test_process_back_decodes_sources() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");

        let mut note = Note::new("Q", r#"<img src="my%20file.png">"#);
        resolver.process_back(&mut note).unwrap();
        assert_eq!(note.media, vec![format!("{}.png", unique_file_name("my file.png"))]);
    }

    #[test]
    fn test_process_back_audio() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");

        let mut note = Note::new("Q", r#"<a href="audio/clip.mp3">clip</a>"#);
        let count = resolver.process_back(&mut note).unwrap();

        let new_name = format!("{}.mp3", unique_file_name("audio/clip.mp3"));
        assert_eq!(count, 0);
        assert!(note.back.ends_with(&format!("[sound:{}]", new_name)));
        assert_eq!(note.media, vec![new_name]);
    }

    #[test]
    fn test_process_back_video_is_additive() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");

        let original = "watch https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1 and https://soundcloud.com/artist/track";
        let mut note = Note::new("Q", original);
        resolver.process_back(&mut note).unwrap();

        assert!(note.back.starts_with(original));
        assert!(note.back.contains("https://www.youtube.com/embed/dQw4w9WgXcQ?"));
        assert!(note.back.contains("player/?url=https://soundcloud.com/artist/track"));
        assert!(exporter.media.is_empty());
    }

    #[test]
    fn test_invalid_encoding_is_an_error() {
        let files = files();
        let mut exporter = RecordingExporter::default();
        let mut resolver = MediaResolver::new(&files, &mut exporter, "Root");

        let mut note = Note::new("Q", r#"<img src="bad%FF.png">"#);
        assert!(matches!(
            resolver.process_back(&mut note),
            Err(Error::InvalidPath(_))
        ));
    }
}
