use crate::audio::queue::QueueContext;
use crate::model::Song;

/// Lifecycle of the single process-wide playback slot. A song is always
/// paired with the queue context it was launched from, and the stopped state
/// carries nothing, so "no current song but playing" cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    Stopped,
    Loading { song: Song, context: QueueContext },
    Playing { song: Song, context: QueueContext },
    Paused { song: Song, context: QueueContext },
}

impl PlaybackState {
    pub fn current_song(&self) -> Option<&Song> {
        match self {
            PlaybackState::Stopped => None,
            PlaybackState::Loading { song, .. }
            | PlaybackState::Playing { song, .. }
            | PlaybackState::Paused { song, .. } => Some(song),
        }
    }

    pub fn context(&self) -> Option<QueueContext> {
        match self {
            PlaybackState::Stopped => None,
            PlaybackState::Loading { context, .. }
            | PlaybackState::Playing { context, .. }
            | PlaybackState::Paused { context, .. } => Some(*context),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }
}
