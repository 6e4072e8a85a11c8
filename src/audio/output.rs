use crate::audio::backend::{AudioBackend, AudioHandle};
use crate::audio::error::PlaybackError;
use async_trait::async_trait;
use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Plays fetched media through the default output device. Tracks are decoded
/// fully into memory, which keeps the loop flag toggleable on a live handle
/// and makes position reporting exact.
pub struct RodioBackend {
    mixer: Mixer,
    http: reqwest::Client,
}

impl RodioBackend {
    pub fn new() -> Result<Self, PlaybackError> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|err| PlaybackError::Device(err.to_string()))?;
        let mixer = stream.mixer().clone();
        // The device stream has to outlive every handle; it is tied to the
        // process lifetime.
        std::mem::forget(stream);

        Ok(Self {
            mixer,
            http: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    async fn load(&self, url: &str, looping: bool) -> Result<Box<dyn AudioHandle>, PlaybackError> {
        let network = |err: reqwest::Error| PlaybackError::Network(err.to_string());

        debug!(url, "media_fetch");
        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .map_err(network)?
            .error_for_status()
            .map_err(|err| PlaybackError::Load {
                track: url.to_string(),
                reason: err.to_string(),
            })?
            .bytes()
            .await
            .map_err(network)?
            .to_vec();

        // Decoding a full track is CPU-bound; keep it off the runtime.
        let track = tokio::task::spawn_blocking(move || decode_track(bytes))
            .await
            .map_err(|err| PlaybackError::Decode(err.to_string()))??;

        info!(
            url,
            duration_ms = track.duration().as_millis() as u64,
            "media_decoded"
        );

        let shared = Arc::new(SourceShared {
            cursor: AtomicUsize::new(0),
            looping: AtomicBool::new(looping),
        });
        let duration = track.duration();
        let source = MemorySource {
            samples: track.samples.clone(),
            channels: track.channels,
            sample_rate: track.sample_rate,
            duration,
            shared: shared.clone(),
        };

        let sink = Sink::connect_new(&self.mixer);
        sink.append(source);

        Ok(Box::new(RodioHandle {
            sink,
            shared,
            duration,
        }))
    }
}

struct DecodedTrack {
    samples: Arc<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
}

impl DecodedTrack {
    fn duration(&self) -> Duration {
        let frames = self.samples.len() as u64 / self.channels.max(1) as u64;
        Duration::from_secs_f64(frames as f64 / self.sample_rate.max(1) as f64)
    }
}

fn decode_track(bytes: Vec<u8>) -> Result<DecodedTrack, PlaybackError> {
    let decoder = Decoder::new(Cursor::new(bytes))
        .map_err(|err| PlaybackError::Decode(err.to_string()))?;
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.collect();
    if samples.is_empty() {
        return Err(PlaybackError::Decode("empty audio stream".to_string()));
    }
    Ok(DecodedTrack {
        samples: Arc::new(samples),
        channels,
        sample_rate,
    })
}

struct SourceShared {
    /// Interleaved sample index; wraps to 0 when looping.
    cursor: AtomicUsize,
    looping: AtomicBool,
}

/// In-memory source whose loop flag can flip while the sink drains it.
struct MemorySource {
    samples: Arc<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
    duration: Duration,
    shared: Arc<SourceShared>,
}

impl Iterator for MemorySource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let i = self.shared.cursor.fetch_add(1, Ordering::Relaxed);
        if i < self.samples.len() {
            return Some(self.samples[i]);
        }
        if self.shared.looping.load(Ordering::Relaxed) {
            self.shared.cursor.store(1, Ordering::Relaxed);
            return Some(self.samples[0]);
        }
        None
    }
}

impl Source for MemorySource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration)
    }
}

struct RodioHandle {
    sink: Sink,
    shared: Arc<SourceShared>,
    duration: Duration,
}

#[async_trait]
impl AudioHandle for RodioHandle {
    async fn pause(&self) {
        self.sink.pause();
    }

    async fn resume(&self) {
        self.sink.play();
    }

    async fn set_looping(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::SeqCst);
    }

    async fn release(&self) {
        self.sink.stop();
    }

    fn position(&self) -> Duration {
        let position = self.sink.get_pos();
        // While looping the sink position keeps counting past the track end.
        if self.shared.looping.load(Ordering::SeqCst) && !self.duration.is_zero() {
            let millis = position.as_millis() as u64 % self.duration.as_millis().max(1) as u64;
            return Duration::from_millis(millis);
        }
        position
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.duration)
    }
}
