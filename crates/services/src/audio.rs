//! Speech audio: base64 payload to PCM samples, and local playback.
//!
//! The speech endpoint returns raw 16-bit little-endian PCM. Playback renders
//! each buffer to a WAV file and hands it to the system player.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use shared::DripError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
pub const SPEECH_CHANNELS: u16 = 1;

/// Decoded audio. Samples are interleaved and normalized to [-1.0, 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>, DripError> {
    B64.decode(data.trim())
        .map_err(|e| DripError::Playback(format!("invalid base64 audio: {e}")))
}

pub fn decode_pcm(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioBuffer, DripError> {
    if channels == 0 {
        return Err(DripError::Playback("channel count must be positive".into()));
    }
    let frame_bytes = 2 * channels as usize;
    if bytes.len() % frame_bytes != 0 {
        return Err(DripError::Playback(format!(
            "pcm length {} is not a whole number of {}-byte frames",
            bytes.len(),
            frame_bytes
        )));
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Ok(AudioBuffer {
        sample_rate,
        channels,
        samples,
    })
}

/// Decode a speech payload as returned by the provider.
pub fn decode_speech(base64_audio: &str) -> Result<AudioBuffer, DripError> {
    let bytes = decode_base64(base64_audio)?;
    decode_pcm(&bytes, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)
}

/// Write `buffer` as a 16-bit integer WAV file.
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<(), DripError> {
    let spec = hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| DripError::Playback(format!("failed to create wav writer: {e}")))?;
    for &s in &buffer.samples {
        let v = (s.clamp(-1.0, 1.0) * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32);
        writer.write_sample(v as i16).map_err(DripError::playback)?;
    }
    writer.finalize().map_err(DripError::playback)
}

static AUDIO_CONTEXT: OnceLock<AudioContext> = OnceLock::new();

/// Clips older than this are deleted when the global context is created.
const STALE_CLIP_AGE: Duration = Duration::from_secs(60 * 60);

/// Process-wide playback context, created on first use and reused after.
///
/// Clips stay on disk while the system player may still be reading them and
/// are cleared by the next process once they are an hour old.
pub struct AudioContext {
    out_dir: PathBuf,
    clips: AtomicU64,
}

impl AudioContext {
    pub fn global() -> &'static AudioContext {
        AUDIO_CONTEXT.get_or_init(|| {
            let out_dir = std::env::temp_dir().join("daily-drip-audio");
            tracing::debug!(dir = %out_dir.display(), "audio context created");
            let ctx = AudioContext::new(out_dir);
            let removed = ctx.clear_stale(STALE_CLIP_AGE);
            if removed > 0 {
                tracing::debug!(removed, "removed stale clips");
            }
            ctx
        })
    }

    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            clips: AtomicU64::new(0),
        }
    }

    /// Render `buffer` to a fresh file in the context's directory.
    pub fn render(&self, buffer: &AudioBuffer) -> Result<PathBuf, DripError> {
        std::fs::create_dir_all(&self.out_dir).map_err(DripError::playback)?;
        let clip = self.clips.fetch_add(1, Ordering::Relaxed);
        let path = self
            .out_dir
            .join(format!("clip-{}-{}.wav", std::process::id(), clip));
        write_wav(buffer, &path)?;
        Ok(path)
    }

    /// Delete rendered clips at least `max_age` old. Other files are left
    /// alone. Returns how many clips were removed.
    pub fn clear_stale(&self, max_age: Duration) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.out_dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with("clip-") && name.ends_with(".wav")) {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .unwrap_or_default();
            if age >= max_age && std::fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Start playback and return without waiting for it to finish.
    pub fn play(&self, buffer: &AudioBuffer) -> Result<PathBuf, DripError> {
        let path = self.render(buffer)?;
        open::that_detached(&path).map_err(DripError::playback)?;
        tracing::info!(
            path = %path.display(),
            secs = buffer.duration_secs(),
            "playing speech"
        );
        Ok(path)
    }
}
