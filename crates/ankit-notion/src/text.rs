//! Text helpers and rich-media detectors.

use std::sync::LazyLock;

use regex_lite::Regex;

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtu\.be/|youtube\.com(?:/embed/|/v/|/watch\?v=|/user/\S+|/ytscreeningroom\?v=|/sandalsResorts#\w/\w/.*/))([^/&]{10,12})",
    )
    .expect("BUG: hardcoded YouTube pattern is invalid")
});

static SOUNDCLOUD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://soundcloud.com").expect("BUG: hardcoded SoundCloud pattern is invalid")
});

static SOUNDCLOUD_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://soundcloud\.com/\S*")
        .expect("BUG: hardcoded SoundCloud URL pattern is invalid")
});

static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s+(?:[^>]*?\s+)?href=(?:"([^"]*)"|'([^']*)')"#)
        .expect("BUG: hardcoded anchor pattern is invalid")
});

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<+\s?img").expect("BUG: hardcoded img pattern is invalid"));

/// Replace every occurrence of `old` with `new`, treating `old` literally.
///
/// An empty `old` leaves the input untouched.
pub fn replace_all(original: &str, old: &str, new: &str) -> String {
    if old.is_empty() {
        return original.to_string();
    }
    original.replace(old, new)
}

/// The first YouTube video id referenced in `input`.
///
/// Matches that actually belong to a SoundCloud embed are ignored.
pub fn youtube_id(input: &str) -> Option<String> {
    let input = non_blank(input)?;
    let captures = YOUTUBE_ID.captures(input)?;
    let whole = captures.get(0)?.as_str();
    if SOUNDCLOUD.is_match(whole) {
        return None;
    }
    captures.get(1).map(|id| id.as_str().to_string())
}

/// The first SoundCloud URL in `input`, cut at the end of an enclosing attribute.
pub fn soundcloud_url(input: &str) -> Option<String> {
    let input = non_blank(input)?;
    let found = SOUNDCLOUD_URL.find(input)?.as_str();
    found.split("\">").next().map(String::from)
}

/// The first anchor target in `input` when it is a local `.mp3` file.
pub fn mp3_link(input: &str) -> Option<String> {
    let input = non_blank(input)?;
    let captures = ANCHOR_HREF.captures(input)?;
    let href = captures.get(1).or_else(|| captures.get(2))?.as_str();
    if !href.ends_with(".mp3") || href.starts_with("http") {
        return None;
    }
    Some(href.to_string())
}

/// Number of `<img` openings in `input`.
pub fn count_images(input: &str) -> usize {
    IMG_TAG.find_iter(input).count()
}

/// Embed markup for a YouTube video id.
pub fn youtube_embed(id: &str) -> String {
    let src = format!("https://www.youtube.com/embed/{}?", id).replacen('"', "", 1);
    format!(
        "<iframe width='560' height='315' src='{}' frameborder='0' allowfullscreen></iframe>",
        src
    )
}

/// Embed markup for a SoundCloud track.
pub fn soundcloud_embed(url: &str) -> String {
    format!(
        "<iframe width='100%' height='166' scrolling='no' frameborder='no' src='https://w.soundcloud.com/player/?url={}'></iframe>",
        url
    )
}

fn non_blank(input: &str) -> Option<&str> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input)
    }
}
