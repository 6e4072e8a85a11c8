pub mod likes;

use crate::audio::engine::PlaybackEngine;
use crate::audio::queue::QueueContext;
use crate::auth::session::AuthSession;
use crate::http::{ApiError, CatalogApi};
use crate::model::Song;
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only song listings. Fetch failures degrade to an empty list so a
/// flaky network never wedges a screen; the error is logged, not surfaced.
/// The liked list is an authenticated call and goes through the session.
pub struct CatalogClient {
    catalog: Arc<dyn CatalogApi>,
    auth: Arc<AuthSession>,
}

impl CatalogClient {
    pub fn new(catalog: Arc<dyn CatalogApi>, auth: Arc<AuthSession>) -> Self {
        Self { catalog, auth }
    }

    pub async fn all_songs(&self) -> Vec<Song> {
        unwrap_or_empty(self.catalog.all_songs().await, "all_songs")
    }

    pub async fn search(&self, query: &str) -> Vec<Song> {
        unwrap_or_empty(self.catalog.search_songs(query).await, "search_songs")
    }

    /// Genre listing. The `Rap` → `Hip-Hop` aliasing lives server-side; the
    /// query is passed through untouched.
    pub async fn genre(&self, genre: &str) -> Vec<Song> {
        unwrap_or_empty(self.catalog.genre_songs(genre).await, "genre_songs")
    }

    pub async fn liked(&self) -> Vec<Song> {
        unwrap_or_empty(self.auth.liked_songs().await, "liked_songs")
    }

    pub async fn load_home(&self, engine: &PlaybackEngine) -> Vec<Song> {
        let songs = self.all_songs().await;
        info!(count = songs.len(), "home_queue_loaded");
        engine.set_queue(QueueContext::Home, songs.clone());
        songs
    }

    pub async fn load_library(&self, engine: &PlaybackEngine) -> Vec<Song> {
        let songs = self.liked().await;
        info!(count = songs.len(), "library_queue_loaded");
        engine.set_queue(QueueContext::Library, songs.clone());
        songs
    }
}

fn unwrap_or_empty(result: Result<Vec<Song>, ApiError>, what: &str) -> Vec<Song> {
    match result {
        Ok(songs) => songs,
        Err(err) => {
            warn!(what, error = %err, "catalog_fetch_failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::testing::MockBackend;
    use crate::auth::session::AuthState;
    use crate::auth::store::TokenStore;
    use crate::event::events::Event;
    use crate::http::testing::{FakeApi, song};

    struct Fixture {
        api: Arc<FakeApi>,
        engine: Arc<PlaybackEngine>,
        auth: Arc<AuthSession>,
        catalog: CatalogClient,
        rx: flume::Receiver<Event>,
        _dir: tempfile::TempDir,
    }

    fn fixture(songs: Vec<Song>) -> Fixture {
        let api = Arc::new(FakeApi::with_songs(songs));
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::at(dir.path().to_path_buf());
        let (tx, rx) = flume::unbounded();
        let engine = Arc::new(PlaybackEngine::new(
            Arc::new(MockBackend::default()),
            "http://localhost:3000/media",
            tx.clone(),
        ));
        let auth = Arc::new(AuthSession::new(api.clone(), store, tx));
        let catalog = CatalogClient::new(api.clone(), auth.clone());
        Fixture {
            api,
            engine,
            auth,
            catalog,
            rx,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn load_home_installs_the_catalog() {
        let f = fixture(vec![song("s1", "one"), song("s2", "two")]);
        let songs = f.catalog.load_home(&f.engine).await;
        assert_eq!(songs.len(), 2);
        assert_eq!(f.engine.queue(QueueContext::Home).len(), 2);
    }

    #[tokio::test]
    async fn load_library_installs_the_liked_list() {
        let f = fixture(vec![song("s1", "one"), song("s2", "two")]);
        f.auth.sign_up("a@x.com", "ada", "Abcdef12").await.unwrap();
        f.api.liked.lock().unwrap().insert("s2".to_string());

        let songs = f.catalog.load_library(&f.engine).await;
        assert_eq!(songs.len(), 1);
        assert_eq!(f.engine.queue(QueueContext::Library)[0].id, "s2");
    }

    #[tokio::test]
    async fn expired_token_on_a_library_load_forces_logout() {
        let f = fixture(vec![song("s1", "one")]);
        f.auth.sign_up("a@x.com", "ada", "Abcdef12").await.unwrap();
        f.api.revoke_all();
        f.rx.drain().count();

        let songs = f.catalog.load_library(&f.engine).await;
        assert!(songs.is_empty());
        assert_eq!(f.auth.state(), AuthState::Unauthenticated);
        assert!(f.rx.drain().any(|e| matches!(e, Event::SessionExpired)));
    }
}
