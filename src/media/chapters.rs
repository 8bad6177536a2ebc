use regex::Regex;
use std::sync::OnceLock;

use super::Chapter;
use crate::timespec::TimeSpec;

/// Fewer timestamps than this is a passing mention, not a chapter list
const MIN_DESCRIPTION_CHAPTERS: usize = 2;

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(?\b((?:\d{1,2}:)?\d{1,2}:\d{2})\b\)?").expect("timestamp regex is valid")
    })
}

/// Build chapters from `[H:]MM:SS Title` lines in a video description.
///
/// Each chapter ends where the next one starts; the last ends at `duration`.
/// Lines whose timestamp does not move forward are skipped.
pub fn chapters_from_description(description: &str, duration: Option<u64>) -> Vec<Chapter> {
    let mut starts: Vec<(u64, String)> = Vec::new();

    for line in description.lines() {
        let Some(found) = timestamp_regex().captures(line) else {
            continue;
        };
        let (Some(whole), Some(stamp)) = (found.get(0), found.get(1)) else {
            continue;
        };
        let Some(start) = TimeSpec::parse(stamp.as_str()).ok().and_then(|t| t.seconds()) else {
            continue;
        };
        if duration.is_some_and(|d| start >= d) {
            continue;
        }
        if starts.last().is_some_and(|(prev, _)| start <= *prev) {
            continue;
        }

        let mut title = String::with_capacity(line.len());
        title.push_str(&line[..whole.start()]);
        title.push_str(&line[whole.end()..]);
        let title = title
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '–' | '—' | '|'))
            .to_string();
        let title = if title.is_empty() {
            format!("Part {}", starts.len() + 1)
        } else {
            title
        };

        starts.push((start, title));
    }

    if starts.len() < MIN_DESCRIPTION_CHAPTERS {
        return Vec::new();
    }

    let next_starts: Vec<Option<u64>> = starts
        .iter()
        .skip(1)
        .map(|(start, _)| Some(*start))
        .chain(std::iter::once(duration))
        .collect();

    starts
        .into_iter()
        .zip(next_starts)
        .map(|((start, title), end)| Chapter { title, start, end })
        .collect()
}
