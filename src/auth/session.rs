use crate::audio::engine::PlaybackEngine;
use crate::auth::store::TokenStore;
use crate::event::events::Event;
use crate::http::{ApiError, AuthApi};
use crate::model::Song;
use flume::Sender;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Credential lifecycle. Authenticated holds the token that was last
/// validated; there is no token outside that variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated { token: String },
}

/// Owns the session state machine and gates everything that needs a
/// credential. All authenticated calls funnel their failures through one
/// expiry handler, so a 401 anywhere ends the session the same way.
pub struct AuthSession {
    api: Arc<dyn AuthApi>,
    store: TokenStore,
    state: RwLock<AuthState>,
    event_tx: Sender<Event>,
}

impl AuthSession {
    pub fn new(api: Arc<dyn AuthApi>, store: TokenStore, event_tx: Sender<Event>) -> Self {
        Self {
            api,
            store,
            state: RwLock::new(AuthState::Unauthenticated),
            event_tx,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.read().unwrap().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.state.read().unwrap(), AuthState::Authenticated { .. })
    }

    pub fn token(&self) -> Option<String> {
        match &*self.state.read().unwrap() {
            AuthState::Authenticated { token } => Some(token.clone()),
            _ => None,
        }
    }

    fn set_state(&self, next: AuthState) {
        *self.state.write().unwrap() = next;
    }

    /// Startup path: validate a persisted token against the server. Any
    /// failure clears the stale token and leaves the session signed out.
    pub async fn restore(&self) -> bool {
        self.set_state(AuthState::Authenticating);
        let Some(token) = self.store.load().await else {
            self.set_state(AuthState::Unauthenticated);
            return false;
        };
        match self.api.me(&token).await {
            Ok(()) => {
                info!("session_restored");
                self.set_state(AuthState::Authenticated { token });
                let _ = self.event_tx.send(Event::SignedIn);
                true
            }
            Err(err) => {
                warn!(error = %err, "session_restore_failed");
                self.store.clear().await;
                self.set_state(AuthState::Unauthenticated);
                false
            }
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        self.set_state(AuthState::Authenticating);
        match self.api.sign_up(email, username, password).await {
            Ok(response) => {
                self.install(response.access_token).await;
                Ok(())
            }
            Err(err) => {
                self.set_state(AuthState::Unauthenticated);
                Err(err)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
        self.set_state(AuthState::Authenticating);
        match self.api.sign_in(email, password).await {
            Ok(response) => {
                self.install(response.access_token).await;
                Ok(())
            }
            Err(err) => {
                self.set_state(AuthState::Unauthenticated);
                Err(err)
            }
        }
    }

    /// Signing out invalidates the media URLs, so playback is quiesced
    /// before the credential goes away.
    pub async fn sign_out(&self, playback: &PlaybackEngine) {
        playback.stop().await;
        self.store.clear().await;
        self.set_state(AuthState::Unauthenticated);
        let _ = self.event_tx.send(Event::SignedOut);
    }

    /// Partial account update; blank fields are left unchanged by the
    /// server. Rotates the stored token on success.
    pub async fn update_account(
        &self,
        new_email: &str,
        new_username: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let result = self
            .api
            .update_account(new_email, new_username, new_password, &token)
            .await;
        let response = self.guard(result).await?;
        self.install(response.access_token).await;
        Ok(())
    }

    /// Flips the account between FREE and PREMIUM; the token rotates but the
    /// session stays authenticated.
    pub async fn toggle_role(&self) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let result = self.api.toggle_role(&token).await;
        let response = self.guard(result).await?;
        self.install(response.access_token).await;
        Ok(())
    }

    /// Deletes the account server-side. Same ordering rule as sign-out:
    /// playback stops before the credential is dropped.
    pub async fn delete_account(&self, playback: &PlaybackEngine) -> Result<(), ApiError> {
        let token = self.require_token()?;
        playback.stop().await;
        let result = self.api.delete_account(&token).await;
        self.guard(result).await?;
        self.store.clear().await;
        self.set_state(AuthState::Unauthenticated);
        let _ = self.event_tx.send(Event::SignedOut);
        Ok(())
    }

    pub async fn add_liked_song(&self, song_id: &str) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let result = self.api.add_like(&token, song_id).await;
        self.guard(result).await
    }

    pub async fn remove_liked_song(&self, song_id: &str) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let result = self.api.remove_like(&token, song_id).await;
        self.guard(result).await
    }

    pub async fn liked_songs(&self) -> Result<Vec<Song>, ApiError> {
        let token = self.require_token()?;
        let result = self.api.liked_songs(&token).await;
        self.guard(result).await
    }

    fn require_token(&self) -> Result<String, ApiError> {
        self.token().ok_or(ApiError::Auth {
            message: "not signed in".to_string(),
            status: 401,
        })
    }

    /// Single funnel for authenticated-call failures: any 401 clears the
    /// persisted token and signs the session out.
    async fn guard<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result {
            if err.is_unauthorized() {
                warn!("session_expired");
                self.store.clear().await;
                self.set_state(AuthState::Unauthenticated);
                let _ = self.event_tx.send(Event::SessionExpired);
            }
        }
        result
    }

    async fn install(&self, token: String) {
        self.store.save(&token).await;
        self.set_state(AuthState::Authenticated { token });
        let _ = self.event_tx.send(Event::SignedIn);
    }
}
