pub mod error;

pub use error::ApiError;

use crate::model::Song;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Account surface of the backend. Everything taking a token is an
/// authenticated call and is subject to the session-expiry policy.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ApiError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError>;
    async fn toggle_role(&self, token: &str) -> Result<TokenResponse, ApiError>;
    async fn update_account(
        &self,
        new_email: &str,
        new_username: &str,
        new_password: &str,
        token: &str,
    ) -> Result<TokenResponse, ApiError>;
    async fn delete_account(&self, token: &str) -> Result<MessageResponse, ApiError>;
    /// Authenticated probe; used to validate a restored token and by the
    /// expiry policy.
    async fn me(&self, token: &str) -> Result<(), ApiError>;
    async fn add_like(&self, token: &str, song_id: &str) -> Result<(), ApiError>;
    async fn remove_like(&self, token: &str, song_id: &str) -> Result<(), ApiError>;
    async fn liked_songs(&self, token: &str) -> Result<Vec<Song>, ApiError>;
}

/// Public catalog surface. The server owns ordering (getSongs is randomized)
/// and genre aliasing (a `Rap` query maps to `Hip-Hop` upstream).
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn all_songs(&self) -> Result<Vec<Song>, ApiError>;
    async fn search_songs(&self, query: &str) -> Result<Vec<Song>, ApiError>;
    async fn genre_songs(&self, genre: &str) -> Result<Vec<Song>, ApiError>;
}

pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        debug!(path, "api_get");
        let response = self.http.get(self.url(path)).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "api_post");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    /// POST where only the status matters; the success body is discarded.
    async fn post_status<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        debug!(path, "api_post");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await?;
        Err(ApiError::from_response(status.as_u16(), &bytes))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        if status.is_success() {
            serde_json::from_slice(&bytes)
                .map_err(|err| ApiError::Transport(format!("invalid response body: {err}")))
        } else {
            Err(ApiError::from_response(status.as_u16(), &bytes))
        }
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn sign_up(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ApiError> {
        self.post_json(
            "auth/signup",
            &json!({ "email": email, "username": username, "password": password }),
        )
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        self.post_json("auth/signin", &json!({ "email": email, "password": password }))
            .await
    }

    async fn toggle_role(&self, token: &str) -> Result<TokenResponse, ApiError> {
        self.post_json("auth/role", &json!({ "token": token })).await
    }

    async fn update_account(
        &self,
        new_email: &str,
        new_username: &str,
        new_password: &str,
        token: &str,
    ) -> Result<TokenResponse, ApiError> {
        // Blank fields mean "leave unchanged" on the server side.
        self.post_json(
            "auth/update",
            &json!({
                "newEmail": new_email,
                "newUsername": new_username,
                "newPassword": new_password,
                "token": token,
            }),
        )
        .await
    }

    async fn delete_account(&self, token: &str) -> Result<MessageResponse, ApiError> {
        self.post_json("auth/delete", &json!({ "token": token })).await
    }

    async fn me(&self, token: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .get(self.url("user/me"))
            .bearer_auth(token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await?;
        Err(ApiError::from_response(status.as_u16(), &bytes))
    }

    async fn add_like(&self, token: &str, song_id: &str) -> Result<(), ApiError> {
        self.post_status("auth/addLike", &json!({ "token": token, "idSong": song_id }))
            .await
    }

    async fn remove_like(&self, token: &str, song_id: &str) -> Result<(), ApiError> {
        self.post_status("auth/removeLike", &json!({ "token": token, "idSong": song_id }))
            .await
    }

    async fn liked_songs(&self, token: &str) -> Result<Vec<Song>, ApiError> {
        self.get_json("auth/getLikedSongs", &[("query", token)]).await
    }
}

#[async_trait]
impl CatalogApi for ApiClient {
    async fn all_songs(&self) -> Result<Vec<Song>, ApiError> {
        self.get_json("song/getSongs", &[]).await
    }

    async fn search_songs(&self, query: &str) -> Result<Vec<Song>, ApiError> {
        self.get_json("song/getSearchSongs", &[("query", query)]).await
    }

    async fn genre_songs(&self, genre: &str) -> Result<Vec<Song>, ApiError> {
        self.get_json("song/getGenreSongs", &[("query", genre)]).await
    }
}
