use crate::catalog::Catalog;
use crate::error::{CoreError, Result};
use crate::events::{PlayerEvent, PlayerStatus};
use crate::sequencer::{Direction, PlaybackAction, PlaybackMode, Position, Sequencer};
use crate::settings::{KeyValueStore, SettingsDraft, SettingsStore};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Arguments for loading a clip into the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub video_id: String,
    pub start_seconds: Seconds,
    pub end_seconds: Seconds,
}

impl From<&ResolvedClip> for LoadRequest {
    fn from(clip: &ResolvedClip) -> Self {
        Self {
            video_id: clip.video_id.clone(),
            start_seconds: clip.start,
            end_seconds: clip.end,
        }
    }
}

/// The embedded video player the clips are handed to.
pub trait VideoPlayer {
    fn load_video_by_id(&mut self, request: &LoadRequest) -> Result<()>;
    fn stop_video(&mut self) -> Result<()>;
    fn play_video(&mut self) -> Result<()>;
    fn player_state(&self) -> Result<PlayerStatus>;
    /// Seconds of the current video played so far.
    fn duration(&self) -> Result<Seconds>;
}

/// User commands coming from the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    ToggleRandom,
    OpenSettings,
    SetDefaultDuration(Seconds),
    CloseSettings,
    OpenDescription,
    CloseDescription,
}

/// Binds a [`Sequencer`] and a [`SettingsStore`] to a [`VideoPlayer`].
pub struct ClipPlayer<P: VideoPlayer, S: KeyValueStore> {
    sequencer: Sequencer,
    settings: SettingsStore<S>,
    player: P,
    draft: Option<SettingsDraft>,
    description_open: bool,
    rng: StdRng,
}

impl<P: VideoPlayer, S: KeyValueStore> ClipPlayer<P, S> {
    pub fn new(catalog: Catalog, mut settings: SettingsStore<S>, player: P) -> Self {
        let duration = settings.default_duration(catalog.channel_id());
        Self {
            sequencer: Sequencer::new(catalog, duration),
            settings,
            player,
            draft: None,
            description_open: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed for the shuffle order.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn now_playing(&self) -> Option<&ResolvedClip> {
        self.sequencer.current()
    }

    pub fn settings_draft(&self) -> Option<&SettingsDraft> {
        self.draft.as_ref()
    }

    pub fn is_description_open(&self) -> bool {
        self.description_open
    }

    /// Load the first clip.
    pub fn start(&mut self) -> Result<ResolvedClip> {
        let clip = self.sequencer.get_next();
        self.load(&clip)?;
        Ok(clip)
    }

    /// Returns the newly loaded clip, if the command loaded one.
    pub fn handle_command(&mut self, command: Command) -> Result<Option<ResolvedClip>> {
        tracing::debug!("Command {:?}", command);
        match command {
            Command::Next => self.skip(Direction::Next).map(Some),
            Command::Previous => self.skip(Direction::Previous).map(Some),
            Command::ToggleRandom => {
                let clip = match self.sequencer.mode() {
                    PlaybackMode::Sequential => self.sequencer.enable_random(&mut self.rng),
                    PlaybackMode::Random => self.sequencer.disable_random(),
                };
                tracing::info!("Playback mode: {:?}", self.sequencer.mode());
                self.load(&clip)?;
                Ok(Some(clip))
            }
            Command::OpenSettings => {
                let channel_id = self.sequencer.catalog().channel_id().to_string();
                self.draft = Some(self.settings.open(&channel_id));
                Ok(None)
            }
            Command::SetDefaultDuration(duration) => {
                let draft = self.draft.as_mut().ok_or_else(|| {
                    CoreError::InvalidSetting("settings are not open".into())
                })?;
                draft.default_duration = duration;
                Ok(None)
            }
            Command::CloseSettings => {
                if let Some(draft) = self.draft.take() {
                    let saved = self.settings.close(draft)?;
                    self.sequencer.set_default_duration(saved.default_duration);
                    tracing::info!("Default duration set to {}s", saved.default_duration.0);
                }
                Ok(None)
            }
            Command::OpenDescription => {
                self.description_open = true;
                Ok(None)
            }
            Command::CloseDescription => {
                self.description_open = false;
                Ok(None)
            }
        }
    }

    /// Returns the newly loaded clip, if the event caused an advance.
    pub fn handle_event(&mut self, event: PlayerEvent) -> Result<Option<ResolvedClip>> {
        let before = self.sequencer.position();
        match self.sequencer.on_player_event(event) {
            PlaybackAction::None => Ok(None),
            PlaybackAction::Play => {
                self.player.play_video()?;
                Ok(None)
            }
            PlaybackAction::Load(clip) => {
                self.load_or_restore(&clip, before)?;
                Ok(Some(clip))
            }
        }
    }

    fn skip(&mut self, direction: Direction) -> Result<ResolvedClip> {
        self.player.stop_video()?;
        self.advance_and_load(direction)
    }

    fn advance_and_load(&mut self, direction: Direction) -> Result<ResolvedClip> {
        let before = self.sequencer.position();
        let clip = self.sequencer.advance(direction);
        self.load_or_restore(&clip, before)?;
        Ok(clip)
    }

    // The cursor stays on the new clip only once the player has accepted it.
    fn load_or_restore(&mut self, clip: &ResolvedClip, before: Position) -> Result<()> {
        let loaded = self.load(clip);
        if loaded.is_err() {
            tracing::warn!("Could not load {}, keeping previous clip", clip.video_id);
            self.sequencer.restore(before);
        }
        loaded
    }

    fn load(&mut self, clip: &ResolvedClip) -> Result<()> {
        tracing::info!(
            "Loading {} [{} - {}] {}",
            clip.video_id,
            clip.start,
            clip.end,
            clip.title
        );
        self.player.load_video_by_id(&LoadRequest::from(clip))
    }
}
