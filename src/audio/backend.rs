use crate::audio::error::PlaybackError;
use async_trait::async_trait;
use std::time::Duration;

/// Producer of audio handles. At most one handle is live at a time; the
/// engine fully releases the previous one before asking for the next.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Fetch and decode `url`, then start playing it. The loop flag is the
    /// engine's flag at load time; later changes arrive via
    /// [`AudioHandle::set_looping`].
    async fn load(&self, url: &str, looping: bool) -> Result<Box<dyn AudioHandle>, PlaybackError>;
}

/// A single loaded audio source, playing from the moment it is created.
#[async_trait]
pub trait AudioHandle: Send + Sync {
    async fn pause(&self);
    async fn resume(&self);
    async fn set_looping(&self, looping: bool);
    /// Stop and free the underlying resources. Safe to call more than once.
    async fn release(&self);
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
}
