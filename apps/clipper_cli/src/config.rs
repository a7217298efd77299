use anyhow::{bail, Context};
use clipper_core::settings::DEFAULT_DURATION;
use clipper_core::types::Seconds;
use clipper_preview::Geometry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 854,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory of `<channel>.json` files, or an `http(s)://` base URL.
    pub catalog: String,
    pub settings_dir: PathBuf,
    /// Default clip duration for channels without saved settings.
    pub default_duration: Seconds,
    pub player: PlayerConfig,
    pub mpv_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: "cache".to_string(),
            settings_dir: PathBuf::from(".clipper"),
            default_duration: DEFAULT_DURATION,
            player: PlayerConfig::default(),
            mpv_path: "mpv".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn catalog_is_remote(&self) -> bool {
        self.catalog.starts_with("http://") || self.catalog.starts_with("https://")
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            x: self.player.x,
            y: self.player.y,
            width: self.player.width,
            height: self.player.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub channel_id: String,
    pub config: Option<PathBuf>,
}

pub const USAGE: &str = "usage: clipper-cli <channel-id> [--config <path>]";

pub fn parse_args<I>(args: I) -> anyhow::Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut channel_id = None;
    let mut config = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') => bail!("unknown option {}\n{}", flag, USAGE),
            _ if channel_id.is_none() => channel_id = Some(arg),
            _ => bail!("unexpected argument {}\n{}", arg, USAGE),
        }
    }
    let channel_id = channel_id.with_context(|| USAGE.to_string())?;
    Ok(CliArgs { channel_id, config })
}
