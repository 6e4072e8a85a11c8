use std::env;

const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Remote endpoints the client talks to. Both values come from the
/// environment so the same build can point at a LAN server or localhost.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the REST API.
    pub api_url: String,
    /// Base URL the `track` and album `image` references resolve against.
    pub media_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_url =
            env::var("MELODIA_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let media_url = env::var("MELODIA_MEDIA_URL")
            .unwrap_or_else(|_| format!("{}/media", api_url.trim_end_matches('/')));

        Self { api_url, media_url }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
