use crate::audio::backend::AudioBackend;
use crate::audio::engine::PlaybackEngine;
use crate::auth::session::AuthSession;
use crate::auth::store::TokenStore;
use crate::catalog::CatalogClient;
use crate::catalog::likes::LikeCoordinator;
use crate::config::AppConfig;
use crate::event::events::Event;
use crate::http::ApiClient;
use flume::{Receiver, Sender};
use std::sync::Arc;

/// Root object owning every shared component. Constructed once at startup
/// and handed to consumers; there is no ambient global state, and each piece
/// of shared state has exactly one writer behind its component.
pub struct AppContext {
    pub api: Arc<ApiClient>,
    pub auth: Arc<AuthSession>,
    pub catalog: Arc<CatalogClient>,
    pub playback: Arc<PlaybackEngine>,
    pub likes: Arc<LikeCoordinator>,
    pub event_tx: Sender<Event>,
    pub event_rx: Receiver<Event>,
}

impl AppContext {
    pub fn new(config: &AppConfig, backend: Arc<dyn AudioBackend>, store: TokenStore) -> Self {
        let (event_tx, event_rx) = flume::unbounded();
        let api = Arc::new(ApiClient::new(&config.api_url));
        let playback = Arc::new(PlaybackEngine::new(
            backend,
            &config.media_url,
            event_tx.clone(),
        ));
        let auth = Arc::new(AuthSession::new(api.clone(), store, event_tx.clone()));
        let catalog = Arc::new(CatalogClient::new(api.clone(), auth.clone()));
        let likes = Arc::new(LikeCoordinator::new(
            auth.clone(),
            playback.clone(),
            event_tx.clone(),
        ));

        Self {
            api,
            auth,
            catalog,
            playback,
            likes,
            event_tx,
            event_rx,
        }
    }
}
