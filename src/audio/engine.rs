use crate::audio::backend::{AudioBackend, AudioHandle};
use crate::audio::error::PlaybackError;
use crate::audio::progress::PlaybackProgress;
use crate::audio::queue::{QueueContext, QueueTable};
use crate::audio::state::PlaybackState;
use crate::event::events::Event;
use crate::model::Song;
use flume::Sender;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Once the track position is within this window of its end the engine
/// advances to the next queue entry, unless looping.
const AUTO_ADVANCE_WINDOW_MS: u64 = 1000;

/// Owns the single live audio handle and serializes every transition of the
/// shared playback state. All other code requests mutations through these
/// methods; nothing else writes playback state.
pub struct PlaybackEngine {
    backend: Arc<dyn AudioBackend>,
    media_url: String,
    state: RwLock<PlaybackState>,
    queues: RwLock<QueueTable>,
    /// Held for the full span of a load so overlapping play calls and
    /// pause requests against a stale handle cannot interleave.
    handle: Mutex<Option<Box<dyn AudioHandle>>>,
    progress: Arc<PlaybackProgress>,
    looping: AtomicBool,
    /// Bumped by `play` and `stop`; a load that finishes after a newer call
    /// took over must not commit its handle.
    generation: AtomicU64,
    /// One-shot per song, so repeated status ticks inside the end-of-track
    /// window advance exactly once.
    advanced: AtomicBool,
    event_tx: Sender<Event>,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn AudioBackend>, media_url: &str, event_tx: Sender<Event>) -> Self {
        Self {
            backend,
            media_url: media_url.trim_end_matches('/').to_string(),
            state: RwLock::new(PlaybackState::Stopped),
            queues: RwLock::new(QueueTable::default()),
            handle: Mutex::new(None),
            progress: Arc::new(PlaybackProgress::default()),
            looping: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            advanced: AtomicBool::new(false),
            event_tx,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state.read().unwrap().clone()
    }

    pub fn current_song(&self) -> Option<Song> {
        self.state.read().unwrap().current_song().cloned()
    }

    pub fn is_playing(&self) -> bool {
        self.state.read().unwrap().is_playing()
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> (u64, u64) {
        self.progress.snapshot()
    }

    pub fn queue(&self, context: QueueContext) -> Vec<Song> {
        self.queues.read().unwrap().get(context).to_vec()
    }

    /// Replaces a queue wholesale. The currently playing song is unaffected
    /// even if it is no longer in the new list.
    pub fn set_queue(&self, context: QueueContext, songs: Vec<Song>) {
        self.queues.write().unwrap().set(context, songs);
    }

    fn track_url(&self, song: &Song) -> String {
        format!("{}/{}", self.media_url, song.track)
    }

    fn set_state(&self, next: PlaybackState) {
        *self.state.write().unwrap() = next;
    }

    fn current(&self) -> Option<(Song, QueueContext)> {
        let state = self.state.read().unwrap();
        Some((state.current_song()?.clone(), state.context()?))
    }

    /// Loads and starts `song`. Any prior handle is fully released before
    /// the new source is loaded; on failure the engine is left stopped with
    /// no handle at all.
    pub async fn play(&self, song: Song, context: QueueContext) -> Result<(), PlaybackError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut handle = self.handle.lock().await;
        if let Some(old) = handle.take() {
            old.release().await;
        }
        self.progress.reset();
        self.set_state(PlaybackState::Loading {
            song: song.clone(),
            context,
        });

        let url = self.track_url(&song);
        info!(song = song.name.as_str(), url = url.as_str(), "playback_load");
        let looping = self.looping.load(Ordering::SeqCst);

        match self.backend.load(&url, looping).await {
            Ok(new_handle) => {
                // A stop() issued while we were loading wins.
                if self.generation.load(Ordering::SeqCst) != generation {
                    new_handle.release().await;
                    return Ok(());
                }
                if let Some(total) = new_handle.duration() {
                    self.progress.set_duration(total);
                }
                *handle = Some(new_handle);
                self.advanced.store(false, Ordering::SeqCst);
                self.set_state(PlaybackState::Playing {
                    song: song.clone(),
                    context,
                });
                let _ = self.event_tx.send(Event::PlaybackStarted(song, context));
                Ok(())
            }
            Err(err) => {
                warn!(song = song.name.as_str(), error = %err, "playback_load_failed");
                self.progress.reset();
                self.set_state(PlaybackState::Stopped);
                Err(err)
            }
        }
    }

    /// Pauses when playing, resumes when paused, and does nothing when
    /// stopped. While a load holds the handle slot the request targets a
    /// stale handle and is dropped.
    pub async fn toggle_play_pause(&self) {
        let Ok(handle) = self.handle.try_lock() else {
            return;
        };
        let Some(handle) = handle.as_ref() else {
            return;
        };

        let transition = {
            let state = self.state.read().unwrap();
            match &*state {
                PlaybackState::Playing { song, context } => Some((
                    false,
                    PlaybackState::Paused {
                        song: song.clone(),
                        context: *context,
                    },
                )),
                PlaybackState::Paused { song, context } => Some((
                    true,
                    PlaybackState::Playing {
                        song: song.clone(),
                        context: *context,
                    },
                )),
                _ => None,
            }
        };
        let Some((resume, next_state)) = transition else {
            return;
        };

        // State first: subscribers see the flip before the audio op lands.
        self.set_state(next_state);
        if resume {
            let _ = self.event_tx.send(Event::PlaybackResumed);
            handle.resume().await;
        } else {
            let _ = self.event_tx.send(Event::PlaybackPaused);
            handle.pause().await;
        }
    }

    /// Circular step backwards through the queue the current song was
    /// launched from. No-op when stopped or when that queue is empty.
    pub async fn previous(&self) -> Result<(), PlaybackError> {
        let Some((current, context)) = self.current() else {
            return Ok(());
        };
        let target = self.queues.read().unwrap().previous(context, &current);
        match target {
            Some(song) => self.play(song, context).await,
            None => Ok(()),
        }
    }

    pub async fn next(&self) -> Result<(), PlaybackError> {
        let Some((current, context)) = self.current() else {
            return Ok(());
        };
        let target = self.queues.read().unwrap().next(context, &current);
        match target {
            Some(song) => self.play(song, context).await,
            None => Ok(()),
        }
    }

    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut handle = self.handle.lock().await;
        if let Some(old) = handle.take() {
            old.release().await;
        }
        self.progress.reset();
        self.set_state(PlaybackState::Stopped);
        let _ = self.event_tx.send(Event::PlaybackStopped);
    }

    pub async fn set_loop(&self, enabled: bool) {
        self.looping.store(enabled, Ordering::SeqCst);
        let handle = self.handle.lock().await;
        if let Some(handle) = handle.as_ref() {
            handle.set_looping(enabled).await;
        }
    }

    pub async fn toggle_loop(&self) -> bool {
        let enabled = !self.is_looping();
        self.set_loop(enabled).await;
        enabled
    }

    /// One tick of the playback watcher: refreshes the shared progress
    /// counters and auto-advances when the current song is about to end.
    /// Ticks that land while a load holds the handle slot are skipped.
    pub async fn poll_playback(&self) -> Result<(), PlaybackError> {
        let snapshot = {
            let Ok(handle) = self.handle.try_lock() else {
                return Ok(());
            };
            let Some(handle) = handle.as_ref() else {
                return Ok(());
            };
            if let Some(total) = handle.duration() {
                self.progress.set_duration(total);
            }
            self.progress.set_position(handle.position());
            self.progress.snapshot()
        };

        if !self.is_playing() || self.is_looping() {
            return Ok(());
        }
        let (position, duration) = snapshot;
        if duration == 0 {
            return Ok(());
        }
        if position + AUTO_ADVANCE_WINDOW_MS >= duration
            && !self.advanced.swap(true, Ordering::SeqCst)
        {
            if let Some(song) = self.current_song() {
                let _ = self.event_tx.send(Event::TrackFinished(song));
            }
            return self.next().await;
        }
        Ok(())
    }
}

/// Drives progress updates and auto-advance for the life of the app.
pub fn spawn_monitor(engine: Arc<PlaybackEngine>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        loop {
            ticker.tick().await;
            if let Err(err) = engine.poll_playback().await {
                warn!(error = %err, "auto_advance_failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::testing::MockBackend;
    use crate::http::testing::song;
    use flume::Receiver;
    use std::sync::atomic::Ordering;

    fn engine_with(
        names: &[&str],
    ) -> (Arc<PlaybackEngine>, Arc<MockBackend>, Receiver<Event>) {
        let backend = Arc::new(MockBackend::default());
        let (tx, rx) = flume::unbounded();
        let engine = Arc::new(PlaybackEngine::new(
            backend.clone(),
            "http://localhost:3000/media",
            tx,
        ));
        let songs = names
            .iter()
            .enumerate()
            .map(|(i, name)| song(&format!("id-{i}"), name))
            .collect();
        engine.set_queue(QueueContext::Home, songs);
        (engine, backend, rx)
    }

    fn started_events(rx: &Receiver<Event>) -> Vec<String> {
        rx.drain()
            .filter_map(|event| match event {
                Event::PlaybackStarted(song, _) => Some(song.name),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn play_replaces_the_previous_handle() {
        let (engine, backend, _rx) = engine_with(&["a", "b"]);
        engine
            .play(song("id-0", "a"), QueueContext::Home)
            .await
            .unwrap();
        engine
            .play(song("id-1", "b"), QueueContext::Home)
            .await
            .unwrap();
        assert_eq!(backend.live_handles(), 1);
        assert_eq!(engine.current_song().unwrap().name, "b");
    }

    #[tokio::test]
    async fn load_failure_leaves_null_state() {
        let (engine, backend, _rx) = engine_with(&["a"]);
        backend.fail_next.store(true, Ordering::SeqCst);
        let err = engine.play(song("id-0", "a"), QueueContext::Home).await;
        assert!(err.is_err());
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(engine.progress(), (0, 0));
    }

    #[tokio::test]
    async fn failed_load_does_not_strand_an_old_song() {
        let (engine, backend, _rx) = engine_with(&["a", "b"]);
        engine
            .play(song("id-0", "a"), QueueContext::Home)
            .await
            .unwrap();
        backend.fail_next.store(true, Ordering::SeqCst);
        assert!(
            engine
                .play(song("id-1", "b"), QueueContext::Home)
                .await
                .is_err()
        );
        // The old handle was released before the load; nothing dangles.
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(engine.current_song(), None);
    }

    #[tokio::test]
    async fn stop_during_a_load_wins() {
        let (engine, backend, _rx) = engine_with(&["a"]);
        let gate = backend.hold_next_load();

        let play = tokio::spawn({
            let engine = engine.clone();
            async move { engine.play(song("id-0", "a"), QueueContext::Home).await }
        });
        while !matches!(engine.state(), PlaybackState::Loading { .. }) {
            tokio::task::yield_now().await;
        }

        let stop = tokio::spawn({
            let engine = engine.clone();
            async move { engine.stop().await }
        });
        // Let stop take over before the load lands.
        tokio::task::yield_now().await;
        gate.notify_one();

        play.await.unwrap().unwrap();
        stop.await.unwrap();
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(engine.current_song(), None);
    }

    #[tokio::test]
    async fn superseded_load_does_not_commit_its_handle() {
        let (engine, backend, rx) = engine_with(&["a", "b"]);
        let gate = backend.hold_next_load();

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.play(song("id-0", "a"), QueueContext::Home).await }
        });
        while !matches!(engine.state(), PlaybackState::Loading { .. }) {
            tokio::task::yield_now().await;
        }

        let second = tokio::spawn({
            let engine = engine.clone();
            async move { engine.play(song("id-1", "b"), QueueContext::Home).await }
        });
        // Second bumps the generation, then queues on the handle slot.
        tokio::task::yield_now().await;
        gate.notify_one();

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(engine.current_song().unwrap().name, "b");
        assert_eq!(backend.live_handles(), 1);
        assert_eq!(started_events(&rx), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn pause_requests_during_a_load_are_dropped() {
        let (engine, backend, rx) = engine_with(&["a", "b"]);
        engine
            .play(song("id-0", "a"), QueueContext::Home)
            .await
            .unwrap();

        let gate = backend.hold_next_load();
        let second = tokio::spawn({
            let engine = engine.clone();
            async move { engine.play(song("id-1", "b"), QueueContext::Home).await }
        });
        while !matches!(engine.state(), PlaybackState::Loading { .. }) {
            tokio::task::yield_now().await;
        }
        rx.drain().count();

        engine.toggle_play_pause().await;
        engine.poll_playback().await.unwrap();
        assert!(matches!(engine.state(), PlaybackState::Loading { .. }));
        assert_eq!(rx.drain().count(), 0);

        gate.notify_one();
        second.await.unwrap().unwrap();
        assert!(engine.is_playing());
        assert!(!backend.last_shared().paused.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn next_walks_the_home_queue_and_wraps() {
        let (engine, _backend, _rx) = engine_with(&["s1", "s2", "s3"]);
        engine
            .play(song("id-0", "s1"), QueueContext::Home)
            .await
            .unwrap();
        engine.next().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s2");
        engine.next().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s3");
        engine.next().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s1");
    }

    #[tokio::test]
    async fn previous_wraps_backwards() {
        let (engine, _backend, _rx) = engine_with(&["s1", "s2", "s3"]);
        engine
            .play(song("id-0", "s1"), QueueContext::Home)
            .await
            .unwrap();
        engine.previous().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s3");
        engine.next().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s1");
    }

    #[tokio::test]
    async fn navigation_is_a_noop_when_stopped() {
        let (engine, backend, _rx) = engine_with(&["s1", "s2"]);
        engine.next().await.unwrap();
        engine.previous().await.unwrap();
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(backend.live_handles(), 0);
    }

    #[tokio::test]
    async fn navigation_is_a_noop_on_an_empty_queue() {
        let (engine, _backend, _rx) = engine_with(&["s1"]);
        engine
            .play(song("id-0", "s1"), QueueContext::Home)
            .await
            .unwrap();
        engine.set_queue(QueueContext::Home, Vec::new());
        engine.next().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s1");
    }

    #[tokio::test]
    async fn navigation_follows_the_launch_context() {
        let (engine, _backend, _rx) = engine_with(&["h1", "h2"]);
        engine.set_queue(
            QueueContext::Library,
            vec![song("l0", "x"), song("l1", "y")],
        );
        engine
            .play(song("l0", "x"), QueueContext::Library)
            .await
            .unwrap();
        engine.next().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "y");
    }

    #[tokio::test]
    async fn toggle_pauses_and_resumes() {
        let (engine, backend, rx) = engine_with(&["a"]);
        engine
            .play(song("id-0", "a"), QueueContext::Home)
            .await
            .unwrap();
        rx.drain().count();

        engine.toggle_play_pause().await;
        assert!(!engine.is_playing());
        assert!(backend.last_shared().paused.load(Ordering::SeqCst));
        assert!(matches!(rx.try_recv(), Ok(Event::PlaybackPaused)));

        engine.toggle_play_pause().await;
        assert!(engine.is_playing());
        assert!(!backend.last_shared().paused.load(Ordering::SeqCst));
        assert!(matches!(rx.try_recv(), Ok(Event::PlaybackResumed)));
    }

    #[tokio::test]
    async fn toggle_is_a_noop_when_stopped() {
        let (engine, _backend, rx) = engine_with(&["a"]);
        engine.toggle_play_pause().await;
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(rx.drain().count(), 0);
    }

    #[tokio::test]
    async fn stop_releases_and_resets() {
        let (engine, backend, _rx) = engine_with(&["a"]);
        engine
            .play(song("id-0", "a"), QueueContext::Home)
            .await
            .unwrap();
        engine.stop().await;
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(engine.progress(), (0, 0));
    }

    #[tokio::test]
    async fn loop_flag_reaches_the_live_handle() {
        let (engine, backend, _rx) = engine_with(&["a"]);
        engine
            .play(song("id-0", "a"), QueueContext::Home)
            .await
            .unwrap();
        engine.set_loop(true).await;
        assert!(backend.last_shared().looping.load(Ordering::SeqCst));
        assert!(engine.is_looping());
        engine.set_loop(false).await;
        assert!(!backend.last_shared().looping.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn auto_advance_fires_exactly_once_per_crossing() {
        let (engine, backend, rx) = engine_with(&["s1", "s2", "s3"]);
        engine
            .play(song("id-0", "s1"), QueueContext::Home)
            .await
            .unwrap();
        rx.drain().count();

        // Inside the end-of-track window; repeated ticks must advance once.
        backend.set_position(29_500);
        for _ in 0..5 {
            engine.poll_playback().await.unwrap();
        }
        assert_eq!(engine.current_song().unwrap().name, "s2");
        assert_eq!(started_events(&rx), vec!["s2".to_string()]);
    }

    #[tokio::test]
    async fn auto_advance_rearms_for_the_next_song() {
        let (engine, backend, _rx) = engine_with(&["s1", "s2"]);
        engine
            .play(song("id-0", "s1"), QueueContext::Home)
            .await
            .unwrap();

        backend.set_position(29_900);
        engine.poll_playback().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s2");

        backend.set_position(29_900);
        engine.poll_playback().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s1");
    }

    #[tokio::test]
    async fn auto_advance_never_fires_while_looping() {
        let (engine, backend, _rx) = engine_with(&["s1", "s2"]);
        engine
            .play(song("id-0", "s1"), QueueContext::Home)
            .await
            .unwrap();
        engine.set_loop(true).await;

        backend.set_position(29_999);
        for _ in 0..5 {
            engine.poll_playback().await.unwrap();
        }
        assert_eq!(engine.current_song().unwrap().name, "s1");
    }

    #[tokio::test]
    async fn auto_advance_waits_while_paused() {
        let (engine, backend, _rx) = engine_with(&["s1", "s2"]);
        engine
            .play(song("id-0", "s1"), QueueContext::Home)
            .await
            .unwrap();
        engine.toggle_play_pause().await;
        backend.set_position(29_900);
        engine.poll_playback().await.unwrap();
        assert_eq!(engine.current_song().unwrap().name, "s1");
    }

    #[tokio::test]
    async fn progress_tracks_the_handle() {
        let (engine, backend, _rx) = engine_with(&["a"]);
        engine
            .play(song("id-0", "a"), QueueContext::Home)
            .await
            .unwrap();
        backend.set_position(1234);
        engine.poll_playback().await.unwrap();
        assert_eq!(engine.progress(), (1234, 30_000));
    }
}
