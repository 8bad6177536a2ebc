//! URL classification without any network round trip.
//!
//! A URL is an item when it names a video (`watch?v=`, `youtu.be/<id>`, `/shorts/<id>`, ...)
//! and a collection when it names a playlist (`list=`, `/playlist`, `/playlists/`).
//! When both are present the item wins.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::TubesplitError;

/// What a URL points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// One video, not yet probed
    Item { url: String },
    /// A playlist whose members are enumerated by probing
    Collection { url: String },
}

impl Classification {
    pub fn url(&self) -> &str {
        match self {
            Classification::Item { url } | Classification::Collection { url } => url,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Classification::Collection { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Classification::Item { .. } => "video",
            Classification::Collection { .. } => "playlist",
        }
    }
}

/// Path prefixes that carry a video id as the next segment
const ITEM_PATH_PREFIXES: &[&str] = &["shorts", "embed", "v", "live"];

/// Classify a raw URL as an item or a collection
pub fn classify(raw: &str) -> Result<Classification, TubesplitError> {
    let url = parse_lenient(raw)?;

    let item = has_item_marker(&url);
    let collection = has_collection_marker(&url);

    tracing::debug!(item, collection, "Classified {}", url);

    let normalized = url.to_string();
    match (item, collection) {
        (true, _) => Ok(Classification::Item { url: normalized }),
        (false, true) => Ok(Classification::Collection { url: normalized }),
        (false, false) => Err(TubesplitError::UnrecognizedUrl(raw.trim().to_string())),
    }
}

/// Accept pasted links without a scheme, e.g. `youtu.be/abc`
fn parse_lenient(raw: &str) -> Result<Url, TubesplitError> {
    let trimmed = raw.trim();
    let unrecognized = || TubesplitError::UnrecognizedUrl(trimmed.to_string());

    if trimmed.is_empty() {
        return Err(unrecognized());
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", trimmed)).map_err(|_| unrecognized())?
        }
        Err(_) => return Err(unrecognized()),
    };

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(unrecognized());
    }

    Ok(parsed)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

fn has_item_marker(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let segments = path_segments(url);

    if host == "youtu.be" || host.ends_with(".youtu.be") {
        return !segments.is_empty();
    }

    match segments.as_slice() {
        [first, ..] if first == "watch" => query_value(url, "v").is_some(),
        [first, _id, ..] => ITEM_PATH_PREFIXES.contains(&first.as_str()),
        _ => false,
    }
}

fn has_collection_marker(url: &Url) -> bool {
    if query_value(url, "list").is_some() {
        return true;
    }
    path_segments(url)
        .iter()
        .any(|segment| segment == "playlist" || segment == "playlists")
}
