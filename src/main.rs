use std::sync::Arc;

use melodia::{
    audio::{engine, output::RodioBackend, queue::QueueContext},
    auth::store::TokenStore,
    config::AppConfig,
    context::AppContext,
    event::events::Event,
    util::{hook::set_panic_hook, log::initialize_logging},
};
use tracing::{info, warn};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> color_eyre::Result<()> {
    setup()?;

    let config = AppConfig::from_env();
    info!(api = config.api_url.as_str(), "starting");

    let backend = Arc::new(RodioBackend::new()?);
    let store = TokenStore::new()?;
    let ctx = AppContext::new(&config, backend, store);

    if !ctx.auth.restore().await {
        match (std::env::var("MELODIA_EMAIL"), std::env::var("MELODIA_PASSWORD")) {
            (Ok(email), Ok(password)) => {
                if let Err(err) = ctx.auth.sign_in(&email, &password).await {
                    warn!(error = %err, "sign_in_failed");
                }
            }
            _ => info!("no persisted session; set MELODIA_EMAIL / MELODIA_PASSWORD to sign in"),
        }
    }

    let songs = ctx.catalog.load_home(&ctx.playback).await;
    if ctx.auth.is_authenticated() {
        ctx.catalog.load_library(&ctx.playback).await;
    }

    let monitor = engine::spawn_monitor(ctx.playback.clone());

    if let Some(first) = songs.first().cloned() {
        if let Err(err) = ctx.playback.play(first, QueueContext::Home).await {
            warn!(error = %err, "initial_play_failed");
        }
    } else {
        info!("catalog is empty; nothing to play");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = ctx.event_rx.recv_async() => match event {
                Ok(event) => log_event(event),
                Err(_) => break,
            },
        }
    }

    monitor.abort();
    ctx.playback.stop().await;
    Ok(())
}

fn log_event(event: Event) {
    match event {
        Event::PlaybackStarted(song, context) => {
            info!(song = song.name.as_str(), ?context, "now playing");
        }
        Event::TrackFinished(song) => info!(song = song.name.as_str(), "track finished"),
        Event::SessionExpired => warn!("session expired; sign in again"),
        other => info!(event = ?other, "event"),
    }
}

fn setup() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    set_panic_hook();
    initialize_logging()
}
