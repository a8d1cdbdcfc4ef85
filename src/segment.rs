use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of a broadcast: an audio track, a spoken announcement, or a
/// timed volume dip. Segments are ordered by `position` within a broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Unique identifier, stable across reorders.
    pub id: u32,
    /// Play-order key. Strictly increasing and unique within a broadcast;
    /// re-derived wholesale on every reorder.
    pub position: u32,
    #[serde(flatten)]
    pub kind: SegmentKind,
}

/// Closed set of segment kinds. Adding a kind is a compile-time-checked
/// exhaustive match everywhere segments are executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum SegmentKind {
    Track(TrackConfig),
    Announcement(AnnouncementConfig),
    VolumeDip(VolumeDipConfig),
}

impl SegmentKind {
    /// Short name for display and event reporting.
    pub fn name(&self) -> &'static str {
        match self {
            SegmentKind::Track(_) => "track",
            SegmentKind::Announcement(_) => "announcement",
            SegmentKind::VolumeDip(_) => "volume_dip",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A music clip played from a source identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Clip locator: either a bare source id or a pasted URL containing one.
    pub source: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Seconds into the clip to start from.
    #[serde(default)]
    pub start_offset: f32,
    /// Seconds at which to stop. 0 = play to the natural end.
    #[serde(default)]
    pub end_offset: f32,
    /// Fade-in duration in seconds.
    #[serde(default)]
    pub fade_in: f32,
    /// Fade-out duration in seconds.
    #[serde(default = "default_fade_out")]
    pub fade_out: f32,
}

fn default_fade_out() -> f32 {
    2.0
}

/// A synthesized speech announcement, optionally ducking the music under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementConfig {
    pub text: String,
    /// Voice selector passed to the speech engine. None = engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Lower the music volume while this announcement plays.
    #[serde(default)]
    pub duck_music: bool,
    /// Volume (0-100) the music is held at while ducked.
    #[serde(default = "default_duck_volume")]
    pub duck_volume: f32,
}

fn default_duck_volume() -> f32 {
    20.0
}

/// A silent segment: dip the music to a target volume, hold, restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeDipConfig {
    /// Target volume (0-100) held during the dip.
    pub volume: f32,
    /// Hold duration in seconds.
    pub duration: f32,
}

impl Segment {
    /// One-line description for list displays.
    pub fn summary(&self) -> String {
        match &self.kind {
            SegmentKind::Track(c) => {
                let title = if c.title.is_empty() { &c.source } else { &c.title };
                format!("{} ({}s in, {}s out)", title, c.fade_in, c.fade_out)
            }
            SegmentKind::Announcement(c) => {
                // Truncate on characters, not bytes
                let text = if c.text.chars().count() > 50 {
                    let head: String = c.text.chars().take(50).collect();
                    format!("{}...", head)
                } else {
                    c.text.clone()
                };
                if c.duck_music {
                    format!("\"{}\" (duck to {}%)", text, c.duck_volume)
                } else {
                    format!("\"{}\"", text)
                }
            }
            SegmentKind::VolumeDip(c) => {
                format!("dip to {}% for {}s", c.volume, c.duration)
            }
        }
    }
}

/// Extract a clip source id from either a bare id or a pasted URL.
///
/// Accepts `https://youtube.com/watch?v=<id>` (id in the query),
/// `https://youtu.be/<id>` (id in the path), or a plain id string.
/// Returns None when the string is URL-shaped but no id can be found,
/// or when it is empty — callers skip the load and advance.
pub fn extract_source_id(source: &str) -> Option<String> {
    let source = source.trim();
    if source.is_empty() {
        return None;
    }

    if source.contains("youtube.com") || source.contains("youtu.be") {
        for marker in ["watch?v=", "youtu.be/"] {
            if let Some(pos) = source.find(marker) {
                let tail = &source[pos + marker.len()..];
                let id: String = tail
                    .chars()
                    .take_while(|c| *c != '&' && *c != '?' && !c.is_whitespace())
                    .collect();
                if !id.is_empty() {
                    return Some(id);
                }
            }
        }
        return None;
    }

    // Bare id — anything without URL markers is taken as-is.
    Some(source.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bare_id() {
        assert_eq!(extract_source_id("abc123").as_deref(), Some("abc123"));
    }

    #[test]
    fn extract_from_watch_url() {
        let id = extract_source_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn extract_from_watch_url_with_extra_params() {
        let id = extract_source_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42");
        assert_eq!(id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn extract_from_short_url() {
        let id = extract_source_id("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn extract_rejects_url_without_id() {
        assert!(extract_source_id("https://www.youtube.com/feed/library").is_none());
        assert!(extract_source_id("https://youtube.com/watch?v=").is_none());
    }

    #[test]
    fn extract_rejects_empty() {
        assert!(extract_source_id("").is_none());
        assert!(extract_source_id("   ").is_none());
    }

    #[test]
    fn extract_trims_whitespace() {
        assert_eq!(extract_source_id("  abc  ").as_deref(), Some("abc"));
    }

    #[test]
    fn track_fade_out_defaults_to_two_seconds() {
        let json = r#"{"source":"abc","title":"Song"}"#;
        let config: TrackConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.fade_out, 2.0);
        assert_eq!(config.fade_in, 0.0);
        assert_eq!(config.start_offset, 0.0);
        assert_eq!(config.end_offset, 0.0);
    }

    #[test]
    fn announcement_duck_volume_defaults_to_twenty() {
        let json = r#"{"text":"Hello listeners"}"#;
        let config: AnnouncementConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.duck_volume, 20.0);
        assert!(!config.duck_music);
        assert!(config.voice.is_none());
    }

    #[test]
    fn segment_serialization_roundtrip() {
        let segment = Segment {
            id: 7,
            position: 2,
            kind: SegmentKind::VolumeDip(VolumeDipConfig {
                volume: 30.0,
                duration: 3.0,
            }),
        };
        let json = serde_json::to_string(&segment).unwrap();
        assert!(json.contains("\"type\":\"volume_dip\""));
        let loaded: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.id, 7);
        assert_eq!(loaded.position, 2);
        match loaded.kind {
            SegmentKind::VolumeDip(c) => {
                assert_eq!(c.volume, 30.0);
                assert_eq!(c.duration, 3.0);
            }
            other => panic!("wrong kind: {}", other),
        }
    }

    #[test]
    fn kind_names() {
        let track = SegmentKind::Track(TrackConfig {
            source: "x".into(),
            title: String::new(),
            start_offset: 0.0,
            end_offset: 0.0,
            fade_in: 0.0,
            fade_out: 2.0,
        });
        assert_eq!(track.name(), "track");
        assert_eq!(format!("{}", track), "track");
    }

    #[test]
    fn summary_handles_multibyte_announcement_text() {
        let long = Segment {
            id: 1,
            position: 0,
            kind: SegmentKind::Announcement(AnnouncementConfig {
                text: "नमस्ते श्रोताओं ".repeat(10),
                voice: None,
                duck_music: false,
                duck_volume: 20.0,
            }),
        };
        assert!(long.summary().contains("..."));

        // Over 50 bytes but under 50 chars: no truncation, no panic
        let short = Segment {
            id: 2,
            position: 0,
            kind: SegmentKind::Announcement(AnnouncementConfig {
                text: "é".repeat(40),
                voice: None,
                duck_music: false,
                duck_volume: 20.0,
            }),
        };
        assert!(short.summary().contains(&"é".repeat(40)));
    }

    #[test]
    fn summary_truncates_long_announcement_text() {
        let segment = Segment {
            id: 1,
            position: 0,
            kind: SegmentKind::Announcement(AnnouncementConfig {
                text: "x".repeat(80),
                voice: None,
                duck_music: false,
                duck_volume: 20.0,
            }),
        };
        assert!(segment.summary().contains("..."));
    }
}
