use clipper_core::events::{ErrorCode, PlayerEvent, PlayerStatus};
use clipper_core::player::{LoadRequest, VideoPlayer};
use clipper_core::types::{watch_url, Seconds};
use clipper_core::{CoreError, Result};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Window placement for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    fn to_mpv(self) -> String {
        format!("{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

pub struct MpvPlayer {
    process: Option<Child>,
    socket_path: PathBuf,
}

impl MpvPlayer {
    pub fn new() -> Self {
        let socket_path =
            std::env::temp_dir().join(format!("clipper-mpv-{}", std::process::id()));
        Self {
            process: None,
            socket_path,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Start an idle mpv window and wait for its IPC socket.
    pub fn start(&mut self, mpv_path: &str, geometry: Geometry) -> Result<()> {
        self.stop();

        let log_path =
            std::env::temp_dir().join(format!("clipper-mpv-{}.log", std::process::id()));
        let log_file = std::fs::File::create(&log_path).ok();
        tracing::info!("Starting mpv with geometry={}", geometry.to_mpv());
        tracing::debug!("mpv log: {}", log_path.display());

        let child = Command::new(mpv_path)
            .args([
                "--idle=yes",
                "--keep-open=no",
                "--force-window=yes",
                "--osd-level=1",
                "--title=clipper",
                &format!("--geometry={}", geometry.to_mpv()),
                &format!("--input-ipc-server={}", self.socket_path.display()),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(log_file.map(Stdio::from).unwrap_or(Stdio::null()))
            .spawn()
            .map_err(|e| CoreError::Player(format!("Failed to start mpv: {}", e)))?;

        self.process = Some(child);

        for _ in 0..50 {
            if self.socket_path.exists() {
                return Ok(());
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        Err(CoreError::Player("mpv socket did not appear".into()))
    }

    fn send_command(&self, command: Value) -> Result<Value> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .map_err(|e| CoreError::Player(format!("Failed to connect to mpv: {}", e)))?;
        stream
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .ok();

        let msg = format!("{}\n", command);
        stream.write_all(msg.as_bytes())?;

        // Events may arrive before the reply on the same connection.
        let mut reader = BufReader::new(stream);
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(CoreError::Player("mpv closed the connection".into()));
            }
            let value: Value = serde_json::from_str(&line)?;
            if value.get("event").is_some() {
                continue;
            }
            return match value.get("error").and_then(Value::as_str) {
                Some("success") | None => Ok(value),
                Some(err) => Err(CoreError::Player(format!("mpv: {}", err))),
            };
        }
    }

    fn get_property(&self, name: &str) -> Result<Value> {
        let resp = self.send_command(json!({ "command": ["get_property", name] }))?;
        Ok(resp.get("data").cloned().unwrap_or(Value::Null))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.send_command(json!({ "command": ["set_property", name, value] }))?;
        Ok(())
    }

    /// Open a second connection that reports player events.
    pub fn subscribe(&self) -> Result<MpvEventStream> {
        MpvEventStream::connect(&self.socket_path)
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

impl Default for MpvPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl VideoPlayer for MpvPlayer {
    fn load_video_by_id(&mut self, request: &LoadRequest) -> Result<()> {
        // start/end are picked up by the next loadfile.
        self.set_property("start", json!(request.start_seconds.0.to_string()))?;
        self.set_property("end", json!(request.end_seconds.0.to_string()))?;
        self.send_command(json!({
            "command": ["loadfile", watch_url(&request.video_id), "replace"]
        }))?;
        Ok(())
    }

    fn stop_video(&mut self) -> Result<()> {
        self.send_command(json!({ "command": ["stop"] }))?;
        Ok(())
    }

    fn play_video(&mut self) -> Result<()> {
        self.set_property("pause", json!(false))
    }

    fn player_state(&self) -> Result<PlayerStatus> {
        if self.get_property("idle-active")?.as_bool().unwrap_or(false) {
            return Ok(PlayerStatus::Unstarted);
        }
        if self.get_property("paused-for-cache")?.as_bool().unwrap_or(false) {
            return Ok(PlayerStatus::Buffering);
        }
        if self.get_property("pause")?.as_bool().unwrap_or(false) {
            return Ok(PlayerStatus::Paused);
        }
        Ok(PlayerStatus::Playing)
    }

    fn duration(&self) -> Result<Seconds> {
        let pos = self.get_property("time-pos")?;
        Ok(Seconds::from_f64(pos.as_f64().unwrap_or(0.0)))
    }
}

/// Reads mpv's event feed and turns it into [`PlayerEvent`]s.
pub struct MpvEventStream {
    reader: BufReader<UnixStream>,
    translator: EventTranslator,
}

impl MpvEventStream {
    fn connect(socket_path: &Path) -> Result<Self> {
        let mut stream = UnixStream::connect(socket_path)
            .map_err(|e| CoreError::Player(format!("Failed to connect to mpv: {}", e)))?;
        for (id, name) in [(1, "pause"), (2, "paused-for-cache"), (3, "time-pos")] {
            let msg = format!("{}\n", json!({ "command": ["observe_property", id, name] }));
            stream.write_all(msg.as_bytes())?;
        }
        Ok(Self {
            reader: BufReader::new(stream),
            translator: EventTranslator::default(),
        })
    }

    /// Block until the next player event. `None` once mpv has gone away.
    pub fn next_event(&mut self) -> Result<Option<PlayerEvent>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let Ok(value) = serde_json::from_str::<Value>(&line) else {
                tracing::debug!("Skipping unreadable mpv line: {}", line.trim_end());
                continue;
            };
            if let Some(event) = self.translator.translate(&value) {
                return Ok(Some(event));
            }
        }
    }
}

/// Maps mpv IPC messages onto player events. Tracks the last playback
/// position so end signals can carry it.
#[derive(Debug, Default)]
pub struct EventTranslator {
    position: Seconds,
}

impl EventTranslator {
    pub fn translate(&mut self, message: &Value) -> Option<PlayerEvent> {
        let position = self.position;
        let state = move |status| {
            Some(PlayerEvent::StateChanged {
                status,
                elapsed: position,
            })
        };
        match message.get("event")?.as_str()? {
            "start-file" => {
                self.position = Seconds::ZERO;
                Some(PlayerEvent::StateChanged {
                    status: PlayerStatus::Unstarted,
                    elapsed: Seconds::ZERO,
                })
            }
            "playback-restart" => state(PlayerStatus::Playing),
            "video-reconfig" => Some(PlayerEvent::QualityChanged),
            "end-file" => match message.get("reason").and_then(Value::as_str) {
                Some("eof") => state(PlayerStatus::Ended),
                Some("error") => {
                    tracing::warn!(
                        "mpv failed to play: {}",
                        message
                            .get("file_error")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or("unknown error")
                    );
                    Some(PlayerEvent::Error(ErrorCode::NOT_FOUND))
                }
                _ => None,
            },
            "property-change" => {
                let data = message.get("data");
                match message.get("name")?.as_str()? {
                    "time-pos" => {
                        if let Some(pos) = data.and_then(Value::as_f64) {
                            self.position = Seconds::from_f64(pos);
                        }
                        None
                    }
                    "pause" => match data.and_then(Value::as_bool)? {
                        true => state(PlayerStatus::Paused),
                        false => state(PlayerStatus::Playing),
                    },
                    "paused-for-cache" => match data.and_then(Value::as_bool)? {
                        true => state(PlayerStatus::Buffering),
                        false => state(PlayerStatus::Playing),
                    },
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
