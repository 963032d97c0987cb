//! Brolly Voice crate - speech-to-text and text-to-speech abstractions.
//!
//! Provides trait-based interfaces for voice input and output, along with
//! mock implementations for development and testing without a real audio
//! provider. A production deployment implements these traits against an
//! external speech service.

use std::future::Future;

use brolly_core::error::{BrollyError, Result};

/// Audio payloads below this size are treated as an empty recording.
const MIN_AUDIO_BYTES: usize = 100;

const MOCK_SAMPLE_RATE: u32 = 16_000;

// =============================================================================
// Traits
// =============================================================================

/// Service converting recorded audio into a text query.
pub trait SpeechToText: Send + Sync {
    /// Transcribe encoded audio bytes into text.
    fn transcribe(&self, audio: &[u8]) -> impl Future<Output = Result<String>> + Send;
}

/// Service rendering an answer as spoken audio.
pub trait TextToSpeech: Send + Sync {
    /// Synthesize the text into encoded audio bytes (WAV).
    fn synthesize(&self, text: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

// =============================================================================
// Mock implementations
// =============================================================================

/// Mock transcription returning a fixed insurance query.
///
/// A recording too small to contain speech yields an apologetic transcript
/// rather than an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSpeechToText;

impl MockSpeechToText {
    pub fn new() -> Self {
        Self
    }
}

impl SpeechToText for MockSpeechToText {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Err(BrollyError::Voice(
                "Cannot transcribe empty audio data".to_string(),
            ));
        }
        if audio.len() < MIN_AUDIO_BYTES {
            tracing::debug!(bytes = audio.len(), "Audio too small to contain speech");
            return Ok(
                "I couldn't hear anything. Could you please try recording again?".to_string(),
            );
        }

        tracing::debug!(bytes = audio.len(), "Mock transcription generated");
        Ok("I need help with insurance".to_string())
    }
}

/// Mock synthesis producing one second of silent 16 kHz mono WAV.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTextToSpeech;

impl MockTextToSpeech {
    pub fn new() -> Self {
        Self
    }
}

impl TextToSpeech for MockTextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(BrollyError::Voice(
                "Cannot synthesize empty text".to_string(),
            ));
        }

        tracing::debug!(chars = text.len(), "Mock synthesis generated");
        Ok(silent_wav(1))
    }
}

/// A valid PCM WAV file of silence: 16 kHz, mono, 16-bit.
fn silent_wav(duration_secs: u32) -> Vec<u8> {
    let num_samples = MOCK_SAMPLE_RATE * duration_secs;
    let data_len = num_samples * 2;

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&MOCK_SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(MOCK_SAMPLE_RATE * 2).to_le_bytes()); // byte rate
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

// =============================================================================
// Tests
// =============================================================================
