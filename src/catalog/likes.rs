use crate::audio::engine::PlaybackEngine;
use crate::audio::queue::QueueContext;
use crate::auth::session::AuthSession;
use crate::event::events::Event;
use crate::http::ApiError;
use crate::model::Song;
use flume::Sender;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Reconciles the cached Library queue with the server-side liked set.
/// Every mutation is followed by a full refetch that replaces the queue
/// wholesale; the cache is never spliced locally, so it cannot drift from
/// server truth. All calls go through the session, so an expired token
/// ends the session here the same as anywhere else.
pub struct LikeCoordinator {
    auth: Arc<AuthSession>,
    engine: Arc<PlaybackEngine>,
    event_tx: Sender<Event>,
    /// Serializes toggles so two toggles of the same song cannot interleave
    /// between the membership check and the refetch.
    toggle_lock: Mutex<()>,
}

impl LikeCoordinator {
    pub fn new(
        auth: Arc<AuthSession>,
        engine: Arc<PlaybackEngine>,
        event_tx: Sender<Event>,
    ) -> Self {
        Self {
            auth,
            engine,
            event_tx,
            toggle_lock: Mutex::new(()),
        }
    }

    /// Flips the liked status of the song at `index` in the list the user is
    /// looking at. Membership is decided against the cached Library queue.
    pub async fn toggle_like(
        &self,
        song_id: &str,
        index: usize,
        snapshot: &[Song],
    ) -> Result<(), ApiError> {
        let _guard = self.toggle_lock.lock().await;
        let Some(song) = snapshot.get(index) else {
            return Ok(());
        };
        let liked = self
            .engine
            .queue(QueueContext::Library)
            .iter()
            .any(|cached| cached.id == song.id);

        if liked {
            self.auth.remove_liked_song(song_id).await?;
        } else {
            self.auth.add_liked_song(song_id).await?;
        }
        self.refresh_library().await
    }

    /// The player screen only ever adds; same refetch contract as the
    /// toggle.
    pub async fn like_from_player(&self, song_id: &str) -> Result<(), ApiError> {
        let _guard = self.toggle_lock.lock().await;
        self.auth.add_liked_song(song_id).await?;
        self.refresh_library().await
    }

    async fn refresh_library(&self) -> Result<(), ApiError> {
        let songs = self.auth.liked_songs().await?;
        info!(count = songs.len(), "library_refreshed");
        self.engine.set_queue(QueueContext::Library, songs.clone());
        let _ = self.event_tx.send(Event::LibraryRefreshed(songs.len()));
        Ok(())
    }
}
