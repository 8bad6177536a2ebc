use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TubesplitError;

/// MP3 bitrates (kbps) offered for audio conversion, best first
pub const MP3_BITRATES: [u32; 8] = [320, 256, 192, 128, 96, 64, 32, 16];

/// Default MP3 bitrate
pub const DEFAULT_MP3_BITRATE: u32 = MP3_BITRATES[0];

/// Quality tiers offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualitySelection {
    /// Best available video and audio
    Auto,
    Max1080,
    Max720,
    Max360,
    AudioOnly,
}

impl QualitySelection {
    pub const ALL: [QualitySelection; 5] = [
        QualitySelection::Auto,
        QualitySelection::Max1080,
        QualitySelection::Max720,
        QualitySelection::Max360,
        QualitySelection::AudioOnly,
    ];

    /// Height cap for video tiers
    pub fn height_cap(&self) -> Option<u32> {
        match self {
            QualitySelection::Max1080 => Some(1080),
            QualitySelection::Max720 => Some(720),
            QualitySelection::Max360 => Some(360),
            QualitySelection::Auto | QualitySelection::AudioOnly => None,
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, QualitySelection::AudioOnly)
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualitySelection::Auto => "Auto",
            QualitySelection::Max1080 => "≤ 1080p",
            QualitySelection::Max720 => "≤ 720p",
            QualitySelection::Max360 => "≤ 360p",
            QualitySelection::AudioOnly => "Audio only",
        }
    }
}

impl TryFrom<usize> for QualitySelection {
    type Error = TubesplitError;

    /// Menu index, in the order of [`QualitySelection::ALL`]
    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            TubesplitError::InvalidSelection(format!(
                "quality menu index {} (expected 0-{})",
                index,
                Self::ALL.len() - 1
            ))
        })
    }
}

impl FromStr for QualitySelection {
    type Err = TubesplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if let Ok(index) = normalized.parse::<usize>() {
            if index < Self::ALL.len() {
                return Self::try_from(index);
            }
        }
        match normalized.as_str() {
            "auto" | "best" => Ok(QualitySelection::Auto),
            "1080" | "1080p" => Ok(QualitySelection::Max1080),
            "720" | "720p" => Ok(QualitySelection::Max720),
            "360" | "360p" => Ok(QualitySelection::Max360),
            "audio" | "audio-only" | "audio_only" => Ok(QualitySelection::AudioOnly),
            _ => Err(TubesplitError::InvalidSelection(format!(
                "unknown quality {:?} (expected auto, 1080, 720, 360 or audio)",
                s
            ))),
        }
    }
}

impl fmt::Display for QualitySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Post-processing applied after retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostProcess {
    /// Transcode to MP3 at a fixed bitrate
    Mp3 { bitrate_kbps: u32 },
}

/// Concrete retrieval instructions derived from a [`QualitySelection`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityDirective {
    pub selection: QualitySelection,

    /// yt-dlp format selector
    pub format: String,

    /// Container to merge separate video/audio streams into
    pub merge_format: Option<String>,

    pub post_process: Option<PostProcess>,
}

impl QualityDirective {
    pub fn cap(&self) -> Option<u32> {
        self.selection.height_cap()
    }

    pub fn transcodes_to_mp3(&self) -> bool {
        matches!(self.post_process, Some(PostProcess::Mp3 { .. }))
    }
}

/// Turn a quality choice into a retrieval directive.
///
/// Video tiers always end in a bare `best` alternative so a source without the
/// requested resolution still downloads. `mp3_bitrate` is only meaningful with
/// `convert_to_mp3`, which is only meaningful for audio-only.
pub fn resolve(
    selection: QualitySelection,
    convert_to_mp3: bool,
    mp3_bitrate: Option<u32>,
) -> Result<QualityDirective, TubesplitError> {
    if convert_to_mp3 && !selection.is_audio_only() {
        return Err(TubesplitError::InvalidSelection(format!(
            "MP3 conversion requires audio-only quality, got {}",
            selection
        )));
    }
    if mp3_bitrate.is_some() && !convert_to_mp3 {
        return Err(TubesplitError::InvalidSelection(
            "an MP3 bitrate was given without MP3 conversion".to_string(),
        ));
    }

    let directive = match selection {
        QualitySelection::Auto => QualityDirective {
            selection,
            format: "bestvideo+bestaudio/best".to_string(),
            merge_format: Some("mp4".to_string()),
            post_process: None,
        },
        QualitySelection::Max1080 | QualitySelection::Max720 | QualitySelection::Max360 => {
            let height = selection.height_cap().unwrap_or_default();
            QualityDirective {
                selection,
                format: format!(
                    "bestvideo[height<={h}]+bestaudio/best[height<={h}]/best",
                    h = height
                ),
                merge_format: Some("mp4".to_string()),
                post_process: None,
            }
        }
        QualitySelection::AudioOnly => {
            let post_process = if convert_to_mp3 {
                let bitrate_kbps = mp3_bitrate.unwrap_or(DEFAULT_MP3_BITRATE);
                if !MP3_BITRATES.contains(&bitrate_kbps) {
                    return Err(TubesplitError::InvalidSelection(format!(
                        "unsupported MP3 bitrate {} kbps (expected one of {:?})",
                        bitrate_kbps, MP3_BITRATES
                    )));
                }
                Some(PostProcess::Mp3 { bitrate_kbps })
            } else {
                None
            };
            QualityDirective {
                selection,
                format: "bestaudio/best".to_string(),
                merge_format: None,
                post_process,
            }
        }
    };

    Ok(directive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caps_match_selection() {
        let expected = [None, Some(1080), Some(720), Some(360), None];
        for (selection, cap) in QualitySelection::ALL.iter().zip(expected) {
            let directive = resolve(*selection, false, None).unwrap();
            assert_eq!(directive.cap(), cap);
            assert!(directive.post_process.is_none());
        }
    }

    #[test]
    fn test_video_tiers_fall_back_to_best() {
        let directive = resolve(QualitySelection::Max720, false, None).unwrap();
        assert_eq!(directive.format, "bestvideo[height<=720]+bestaudio/best[height<=720]/best");
        assert!(directive.format.ends_with("/best"));
        assert_eq!(directive.merge_format.as_deref(), Some("mp4"));
    }

    #[test]
    fn test_audio_only_without_conversion() {
        let directive = resolve(QualitySelection::AudioOnly, false, None).unwrap();
        assert_eq!(directive.format, "bestaudio/best");
        assert!(directive.merge_format.is_none());
        assert!(!directive.transcodes_to_mp3());
    }

    #[test]
    fn test_audio_only_with_conversion_schedules_transcode() {
        let directive = resolve(QualitySelection::AudioOnly, true, None).unwrap();
        assert_eq!(directive.post_process, Some(PostProcess::Mp3 { bitrate_kbps: 320 }));

        let directive = resolve(QualitySelection::AudioOnly, true, Some(128)).unwrap();
        assert_eq!(directive.post_process, Some(PostProcess::Mp3 { bitrate_kbps: 128 }));
    }

    #[test]
    fn test_conversion_rejected_for_video() {
        assert!(matches!(
            resolve(QualitySelection::Max1080, true, None),
            Err(TubesplitError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_bitrate_validation() {
        assert!(matches!(
            resolve(QualitySelection::AudioOnly, true, Some(300)),
            Err(TubesplitError::InvalidSelection(_))
        ));
        assert!(matches!(
            resolve(QualitySelection::AudioOnly, false, Some(320)),
            Err(TubesplitError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("auto".parse::<QualitySelection>(), Ok(QualitySelection::Auto));
        assert_eq!("1080p".parse::<QualitySelection>(), Ok(QualitySelection::Max1080));
        assert_eq!("720".parse::<QualitySelection>(), Ok(QualitySelection::Max720));
        assert_eq!("2".parse::<QualitySelection>(), Ok(QualitySelection::Max720));
        assert_eq!("4".parse::<QualitySelection>(), Ok(QualitySelection::AudioOnly));
        assert_eq!("Audio".parse::<QualitySelection>(), Ok(QualitySelection::AudioOnly));

        for bad in ["5", "480", "4k", ""] {
            assert!(matches!(
                bad.parse::<QualitySelection>(),
                Err(TubesplitError::InvalidSelection(_))
            ));
        }
        assert!(QualitySelection::try_from(7).is_err());
    }
}
