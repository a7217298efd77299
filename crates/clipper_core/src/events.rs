use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by the video player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlayerStatus {
    Unstarted,
    Playing,
    Paused,
    Buffering,
    Ended,
    Error,
}

impl PlayerStatus {
    /// Map the numeric state codes used by embedded web players.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 | 5 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    pub const INVALID_PARAMETER: Self = Self(2);
    pub const HTML5: Self = Self(5);
    pub const NOT_FOUND: Self = Self(100);
    pub const EMBED_RESTRICTED: Self = Self(101);
    pub const EMBED_RESTRICTED_ALT: Self = Self(150);

    /// Codes of 100 and above mean the video cannot be played here at all.
    pub fn is_unplayable(&self) -> bool {
        self.0 >= 100
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready,
    StateChanged { status: PlayerStatus, elapsed: Seconds },
    QualityChanged,
    Error(ErrorCode),
}

/// What the player adapter should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Ignore,
    Play,
    Advance,
}

/// Decides auto-advance from the player's status stream. Remembers only the
/// previously observed status.
#[derive(Debug, Clone, Default)]
pub struct EventInterpreter {
    last_status: Option<PlayerStatus>,
}

impl EventInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> Option<PlayerStatus> {
        self.last_status
    }

    /// `current` is the clip most recently handed to the player.
    pub fn interpret(&mut self, event: PlayerEvent, current: Option<&ResolvedClip>) -> Decision {
        match event {
            PlayerEvent::Ready => Decision::Play,
            PlayerEvent::QualityChanged => Decision::Ignore,
            PlayerEvent::Error(code) => {
                if code.is_unplayable() {
                    tracing::warn!("Player reported unplayable clip (code {}), skipping", code);
                    Decision::Advance
                } else {
                    tracing::warn!("Player reported error code {}", code);
                    Decision::Ignore
                }
            }
            PlayerEvent::StateChanged { status, elapsed } => {
                let decision = self.on_state(status, elapsed, current);
                self.last_status = Some(status);
                decision
            }
        }
    }

    fn on_state(
        &self,
        status: PlayerStatus,
        elapsed: Seconds,
        current: Option<&ResolvedClip>,
    ) -> Decision {
        if status != PlayerStatus::Ended {
            return Decision::Ignore;
        }
        if self.last_status == Some(PlayerStatus::Playing) {
            return Decision::Advance;
        }
        // Ended without a Playing observation: only a real end if playback
        // got at least as far as the clip start.
        match current {
            Some(clip) if elapsed >= clip.start => Decision::Advance,
            _ => {
                tracing::debug!("Ignoring stale end signal at {}", elapsed);
                Decision::Ignore
            }
        }
    }
}
