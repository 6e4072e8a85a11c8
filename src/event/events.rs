use crate::audio::queue::QueueContext;
use crate::model::Song;

/// Application events emitted by the core components. Every event is sent
/// right after the state change it reports commits, so subscribers observe
/// mutations in order even while audio I/O is still pending.
#[derive(Debug, Clone)]
pub enum Event {
    PlaybackStarted(Song, QueueContext),
    PlaybackPaused,
    PlaybackResumed,
    PlaybackStopped,
    /// The current track crossed its end-of-track window; an auto-advance
    /// follows unless looping.
    TrackFinished(Song),
    SignedIn,
    SignedOut,
    /// An authenticated call came back 401; the session was force-cleared.
    SessionExpired,
    LibraryRefreshed(usize),
}
