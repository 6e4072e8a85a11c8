use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared position/duration counters for the live handle, written by the
/// playback monitor and read by subscribers. Zeroed whenever no song is
/// loaded.
#[derive(Debug, Default)]
pub struct PlaybackProgress {
    position_millis: AtomicU64,
    duration_millis: AtomicU64,
}

impl PlaybackProgress {
    pub fn set_position(&self, position: Duration) {
        self.position_millis
            .store(position.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_duration(&self, duration: Duration) {
        self.duration_millis
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// (position_millis, duration_millis)
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.position_millis.load(Ordering::Relaxed),
            self.duration_millis.load(Ordering::Relaxed),
        )
    }

    pub fn reset(&self) {
        self.position_millis.store(0, Ordering::Relaxed);
        self.duration_millis.store(0, Ordering::Relaxed);
    }
}
