use serde::{Deserialize, Serialize};

pub mod chapters;

pub use chapters::chapters_from_description;

/// A single video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// URL handed to the retrieval tool
    pub url: String,

    pub title: String,

    /// Duration in whole seconds, if known
    pub duration: Option<u64>,

    /// Chapters in playback order
    pub chapters: Vec<Chapter>,
}

impl MediaItem {
    /// An item known only by its URL
    pub fn unresolved(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            duration: None,
            chapters: Vec::new(),
        }
    }

    /// Title for display and file naming, falling back to the URL
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

/// A named span of a [`MediaItem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,

    /// Start offset in seconds
    pub start: u64,

    /// End offset in seconds; `None` runs to the end of the item
    pub end: Option<u64>,
}

/// An ordered playlist. Never downloaded itself, only its members are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub url: String,
    pub title: String,

    /// Members in the order reported by the retrieval tool
    pub items: Vec<MediaItem>,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of probing a classified URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Probed {
    Item(MediaItem),
    Collection(Collection),
}
