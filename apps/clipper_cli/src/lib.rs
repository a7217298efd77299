pub mod config;
pub mod input;

use anyhow::Context;
use clipper_core::catalog::{Catalog, DirectorySource};
use clipper_core::events::PlayerEvent;
use clipper_core::player::{ClipPlayer, VideoPlayer};
use clipper_core::settings::{FileStore, SettingsStore};
use clipper_core::types::ResolvedClip;
use clipper_fetch::HttpCatalogSource;
use clipper_preview::{MpvEventStream, MpvPlayer};
use config::{parse_args, AppConfig};
use input::{parse_input, Input, HELP};
use std::io::BufRead;
use tokio::sync::mpsc;

type Player = ClipPlayer<MpvPlayer, FileStore>;

pub fn load_catalog(config: &AppConfig, channel_id: &str) -> clipper_core::Result<Catalog> {
    if config.catalog_is_remote() {
        let source = HttpCatalogSource::new(&config.catalog);
        let catalog = Catalog::load(&source, channel_id)?;
        if let Some(etag) = source.last_etag() {
            tracing::debug!("Catalog etag {}", etag);
        }
        Ok(catalog)
    } else {
        Catalog::load(&DirectorySource::new(&config.catalog), channel_id)
    }
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };

    // Catalog retrieval blocks, so it happens before the runtime starts.
    let catalog = load_catalog(&config, &args.channel_id).map_err(|e| {
        tracing::error!("Cannot load catalog for {}: {}", args.channel_id, e);
        e
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;
    runtime.block_on(session(catalog, config))
}

async fn session(catalog: Catalog, config: AppConfig) -> anyhow::Result<()> {
    let settings = SettingsStore::load(
        FileStore::new(&config.settings_dir),
        config.default_duration,
    )?;

    let mut mpv = MpvPlayer::new();
    mpv.start(&config.mpv_path, config.geometry())?;
    let events = mpv.subscribe()?;
    let mut player = ClipPlayer::new(catalog, settings, mpv);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || pump_events(events, event_tx));
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || pump_stdin(input_tx));

    let clip = player.start()?;
    print_clip(&clip);
    player.handle_event(PlayerEvent::Ready)?;
    println!("{}", HELP);

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Player closed");
                    break;
                };
                match player.handle_event(event) {
                    Ok(Some(clip)) => print_clip(&clip),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Player event {:?} failed: {}", event, e),
                }
            }
            line = input_rx.recv() => {
                let Some(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_input(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => handle_input(&mut player, input),
                    Err(msg) => println!("{}", msg),
                }
            }
        }
    }
    Ok(())
}

fn handle_input(player: &mut Player, input: Input) {
    match input {
        Input::Command(command) => match player.handle_command(command) {
            Ok(Some(clip)) => print_clip(&clip),
            Ok(None) => print_panels(player),
            Err(e) => println!("{}", e),
        },
        Input::Status => match (player.player().player_state(), player.player().duration()) {
            (Ok(status), Ok(elapsed)) => println!("{:?} at {}", status, elapsed),
            (Err(e), _) | (_, Err(e)) => println!("{}", e),
        },
        Input::Help => println!("{}", HELP),
        Input::Quit => {}
    }
}

fn print_clip(clip: &ResolvedClip) {
    println!(
        "> {} [{} - {}] {}",
        clip.title,
        clip.start,
        clip.end,
        clip.recommenders_label()
    );
    println!("  {}", clip.origin_url());
}

fn print_panels(player: &Player) {
    if let Some(draft) = player.settings_draft() {
        println!(
            "Settings for {}: default duration {}s (d <secs> to change, c to save)",
            draft.channel_id(),
            draft.default_duration.0
        );
    }
    if player.is_description_open() {
        let catalog = player.sequencer().catalog();
        println!(
            "Channel {}: {} clips, {:?} order. Clips on the same video that overlap play as one.",
            catalog.channel_id(),
            catalog.len(),
            player.sequencer().mode()
        );
    }
}

fn pump_events(mut events: MpvEventStream, tx: mpsc::UnboundedSender<PlayerEvent>) {
    loop {
        match events.next_event() {
            Ok(Some(event)) => {
                if tx.send(event).is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("mpv event stream failed: {}", e);
                return;
            }
        }
    }
}

fn pump_stdin(tx: mpsc::UnboundedSender<String>) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { return };
        if tx.send(line).is_err() {
            return;
        }
    }
}
