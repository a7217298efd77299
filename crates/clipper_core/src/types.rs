use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

// ---------------------------------------------------------------------------
// Seconds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Seconds(pub u32);

impl Seconds {
    pub const ZERO: Self = Self(0);

    /// Upper bound for clip starts and default durations, so their sum
    /// never saturates.
    pub const MAX_OFFSET: Self = Self(u32::MAX / 2);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    /// Whole seconds from a fractional player position, truncating.
    pub fn from_f64(s: f64) -> Self {
        if s.is_finite() && s > 0.0 {
            Self(s.min(u32::MAX as f64) as u32)
        } else {
            Self::ZERO
        }
    }
}

impl Add for Seconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Seconds {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0 % 60;
        let mins = (self.0 / 60) % 60;
        let hours = self.0 / 3600;
        write!(f, "{:02}:{:02}:{:02}", hours, mins, secs)
    }
}

// ---------------------------------------------------------------------------
// ClipRecord
// ---------------------------------------------------------------------------

/// One clip as published in a channel catalog. `end == 0` means the end is
/// derived from the channel's default duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ClipRecord {
    pub video_id: String,
    pub title: String,
    pub start: Seconds,
    pub end: Seconds,
    pub recommenders: Vec<String>,
}

impl ClipRecord {
    /// End of the clip with the default duration substituted for an open end.
    pub fn effective_end(&self, default_duration: Seconds) -> Seconds {
        if self.end.is_zero() {
            self.start + default_duration
        } else {
            self.end
        }
    }
}

// ---------------------------------------------------------------------------
// ResolvedClip
// ---------------------------------------------------------------------------

/// Page URL a desktop player can open for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedClip {
    /// Raw catalog index the clip starts at.
    pub index: usize,
    pub video_id: String,
    pub title: String,
    pub start: Seconds,
    pub end: Seconds,
    pub duration: Seconds,
    pub recommenders: Vec<String>,
    /// Number of following records absorbed into this clip.
    pub merge_count: usize,
}

impl ResolvedClip {
    /// Raw index of the last record this clip consumed.
    pub fn last_index(&self) -> usize {
        self.index + self.merge_count
    }

    /// Link to the source video at the clip start.
    pub fn origin_url(&self) -> String {
        format!("https://youtu.be/{}?t={}", self.video_id, self.start.0)
    }

    pub fn embed_url(&self) -> String {
        format!(
            "https://www.youtube.com/embed/{}?start={}&end={}&autoplay=1",
            self.video_id, self.start.0, self.end.0
        )
    }

    pub fn watch_url(&self) -> String {
        watch_url(&self.video_id)
    }

    pub fn recommenders_label(&self) -> String {
        if self.recommenders.is_empty() {
            String::new()
        } else {
            format!("Recommended by: {}", self.recommenders.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
