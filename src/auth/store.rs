use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

const TOKEN_FILE: &str = "access_token";
const PREFS_FILE: &str = "prefs.json";

/// File-backed persistence for the session credential, kept under the
/// platform config directory. Persistence failures are logged and swallowed;
/// a session that cannot be saved still works until the app exits.
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new() -> color_eyre::Result<Self> {
        let dirs = ProjectDirs::from("com", "melodia", "melodia")
            .ok_or_else(|| color_eyre::eyre::eyre!("no home directory available"))?;
        let dir = dirs.config_dir().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    fn prefs_path(&self) -> PathBuf {
        self.dir.join(PREFS_FILE)
    }

    pub async fn load(&self) -> Option<String> {
        let token = tokio::fs::read_to_string(self.token_path()).await.ok()?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    pub async fn save(&self, token: &str) {
        if let Err(err) = tokio::fs::write(self.token_path(), token).await {
            warn!(error = %err, "token_save_failed");
        }
    }

    pub async fn clear(&self) {
        match tokio::fs::remove_file(self.token_path()).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(error = %err, "token_clear_failed"),
        }
    }

    pub async fn load_prefs(&self) -> ClientPrefs {
        let Ok(raw) = tokio::fs::read(self.prefs_path()).await else {
            return ClientPrefs::default();
        };
        serde_json::from_slice(&raw).unwrap_or_default()
    }

    pub async fn save_prefs(&self, prefs: &ClientPrefs) {
        let raw = match serde_json::to_vec_pretty(prefs) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "prefs_encode_failed");
                return;
            }
        };
        if let Err(err) = tokio::fs::write(self.prefs_path(), raw).await {
            warn!(error = %err, "prefs_save_failed");
        }
    }
}

/// Client-local playback preferences. Not part of the session; they share
/// its storage lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPrefs {
    pub high_quality_streaming: bool,
    pub stream_over_cellular: bool,
}
