use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TubesplitError;

/// A position inside a media item, in whole seconds.
///
/// `Unspecified` means "from the start" when used as a lower bound and
/// "to the end" when used as an upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeSpec {
    #[default]
    Unspecified,
    At(u64),
}

impl TimeSpec {
    /// Parse `HH:MM:SS`, `MM:SS` or an empty string
    pub fn parse(input: &str) -> Result<Self, TubesplitError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(TimeSpec::Unspecified);
        }

        let invalid = || TubesplitError::InvalidTimeFormat(input.to_string());

        let fields = input
            .split(':')
            .map(|field| parse_field(field).ok_or_else(invalid))
            .collect::<Result<Vec<u64>, _>>()?;

        let (hours, minutes, seconds) = match fields.as_slice() {
            [m, s] => (0, *m, *s),
            [h, m, s] => (*h, *m, *s),
            _ => return Err(invalid()),
        };

        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        hours
            .checked_mul(3600)
            .and_then(|h| h.checked_add(minutes * 60 + seconds))
            .map(TimeSpec::At)
            .ok_or_else(invalid)
    }

    pub fn seconds(&self) -> Option<u64> {
        match self {
            TimeSpec::Unspecified => None,
            TimeSpec::At(secs) => Some(*secs),
        }
    }

    pub fn is_specified(&self) -> bool {
        matches!(self, TimeSpec::At(_))
    }
}

/// Only plain ASCII digits are accepted: no signs, no blanks, no fractions.
fn parse_field(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl From<u64> for TimeSpec {
    fn from(seconds: u64) -> Self {
        TimeSpec::At(seconds)
    }
}

impl FromStr for TimeSpec {
    type Err = TubesplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSpec::parse(s)
    }
}

/// Renders as `H:MM:SS`, which both the parser and yt-dlp accept.
impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Unspecified => write!(f, "unspecified"),
            TimeSpec::At(total) => {
                let hours = total / 3600;
                let minutes = (total % 3600) / 60;
                let seconds = total % 60;
                write!(f, "{}:{:02}:{:02}", hours, minutes, seconds)
            }
        }
    }
}

/// Check that a pair of bounds describes a non-empty range.
///
/// Only fully specified pairs can be out of order; an open end is always valid.
pub fn validate_range(start: TimeSpec, end: TimeSpec) -> Result<(), TubesplitError> {
    if let (TimeSpec::At(s), TimeSpec::At(e)) = (start, end) {
        if s >= e {
            return Err(TubesplitError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
    }
    Ok(())
}
