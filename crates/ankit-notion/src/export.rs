//! The package writer seam.

use std::future::Future;

use crate::deck::Deck;
use crate::error::Result;

/// Receives media and the finished deck tree, and produces a package.
pub trait Exporter {
    /// Register a media file under its final name.
    fn add_media(&mut self, name: &str, bytes: &[u8]);

    /// Hand over the finished deck tree.
    fn configure(&mut self, decks: &[Deck]);

    /// Write the package and return its bytes.
    fn save(self) -> impl Future<Output = Result<Vec<u8>>> + Send;
}
