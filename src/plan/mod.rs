use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod sanitize;
pub mod selection;

pub use sanitize::{sanitize_title, DEFAULT_MAX_NAME_LENGTH};
pub use selection::parse_index_selection;

use crate::media::MediaItem;
use crate::quality::QualityDirective;
use crate::timespec::{validate_range, TimeSpec};
use crate::TubesplitError;

/// How an item should be edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMode {
    /// Whole item
    Full,
    /// One range; either bound may be open
    Cut { start: TimeSpec, end: TimeSpec },
    /// One segment per chapter, optionally restricted to a 1-based selection like `1-3,5`
    Chapters { selection: Option<String> },
}

/// Mode names as offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Full,
    Cut,
    Chapters,
}

impl FromStr for ModeKind {
    type Err = TubesplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0" | "full" => Ok(ModeKind::Full),
            "1" | "cut" => Ok(ModeKind::Cut),
            "2" | "chapters" | "split" => Ok(ModeKind::Chapters),
            _ => Err(TubesplitError::InvalidSelection(format!(
                "unknown mode {:?} (expected full, cut or chapters)",
                s
            ))),
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeKind::Full => write!(f, "full"),
            ModeKind::Cut => write!(f, "cut"),
            ModeKind::Chapters => write!(f, "chapters"),
        }
    }
}

impl EditMode {
    /// Build a mode from raw user input, validating time bounds up front
    pub fn from_input(
        kind: ModeKind,
        start: &str,
        end: &str,
        chapters: Option<&str>,
    ) -> Result<Self, TubesplitError> {
        let has_bounds = !start.trim().is_empty() || !end.trim().is_empty();
        if has_bounds && kind != ModeKind::Cut {
            return Err(TubesplitError::InvalidSelection(format!(
                "start/end times only apply to cut mode, not {}",
                kind
            )));
        }
        if chapters.is_some() && kind != ModeKind::Chapters {
            return Err(TubesplitError::InvalidSelection(format!(
                "a chapter selection only applies to chapters mode, not {}",
                kind
            )));
        }

        match kind {
            ModeKind::Full => Ok(EditMode::Full),
            ModeKind::Cut => {
                let start = TimeSpec::parse(start)?;
                let end = TimeSpec::parse(end)?;
                validate_range(start, end)?;
                Ok(EditMode::Cut { start, end })
            }
            ModeKind::Chapters => Ok(EditMode::Chapters {
                selection: chapters.map(str::to_string),
            }),
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            EditMode::Full => ModeKind::Full,
            EditMode::Cut { .. } => ModeKind::Cut,
            EditMode::Chapters { .. } => ModeKind::Chapters,
        }
    }
}

/// One unit of retrieval work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub source_url: String,
    pub start: TimeSpec,
    pub end: TimeSpec,

    /// File name without extension
    pub output_name: String,

    pub quality: QualityDirective,
}

impl Segment {
    pub fn is_bounded(&self) -> bool {
        self.start.is_specified() || self.end.is_specified()
    }
}

/// File naming knobs for [`plan_segments`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    /// Prepended to every name, e.g. `03 - ` for playlist members
    pub prefix: String,
    pub max_length: usize,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            max_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl Naming {
    fn name(&self, raw: &str, fallback: &str) -> String {
        let clean = sanitize_title(raw, self.max_length);
        let clean = if clean.is_empty() {
            fallback.to_string()
        } else {
            clean
        };
        format!("{}{}", self.prefix, clean)
    }
}

/// Produce the ordered, non-empty list of segments for one item
pub fn plan_segments(
    item: &MediaItem,
    mode: &EditMode,
    quality: &QualityDirective,
    naming: &Naming,
) -> Result<Vec<Segment>, TubesplitError> {
    let segment = |start: TimeSpec, end: TimeSpec, output_name: String| Segment {
        source_url: item.url.clone(),
        start,
        end,
        output_name,
        quality: quality.clone(),
    };

    match mode {
        EditMode::Full => Ok(vec![segment(
            TimeSpec::Unspecified,
            TimeSpec::Unspecified,
            naming.name(&item.title, "video"),
        )]),
        EditMode::Cut { start, end } => {
            validate_range(*start, *end)?;
            if let (Some(s), Some(duration)) = (start.seconds(), item.duration) {
                if s >= duration {
                    return Err(TubesplitError::InvalidRange {
                        start: start.to_string(),
                        end: TimeSpec::At(duration).to_string(),
                    });
                }
            }
            let base = naming.name(&item.title, "video");
            Ok(vec![segment(*start, *end, format!("{}_cut", base))])
        }
        EditMode::Chapters { selection } => {
            if item.chapters.is_empty() {
                return Err(TubesplitError::NoChapters(item.display_title().to_string()));
            }

            let total = item.chapters.len();
            let indices = parse_index_selection(selection.as_deref().unwrap_or(""), total)?;
            let width = total.to_string().len().max(2);

            indices
                .into_iter()
                .map(|index| -> Result<Segment, TubesplitError> {
                    let chapter = &item.chapters[index - 1];
                    let start = TimeSpec::At(chapter.start);
                    let end = chapter.end.map(TimeSpec::At).unwrap_or_default();
                    validate_range(start, end)?;

                    let fallback = format!("Part {}", index);
                    let title = Naming {
                        prefix: String::new(),
                        max_length: naming.max_length,
                    }
                    .name(&chapter.title, &fallback);
                    let name = format!("{}{:0width$} - {}", naming.prefix, index, title, width = width);
                    Ok(segment(start, end, name))
                })
                .collect()
        }
    }
}
