use crate::error::{AprsError, Result};
use crate::filter::TransitionBand;
use std::f32::consts::PI;

/// Destination address used when the caller does not supply one
pub const DEFAULT_DESTINATION: &str = "APRS";

/// Digipeater path used when the caller does not supply one
pub const DEFAULT_PATH: &str = "WIDE1-1,WIDE2-1";

/// Transmit parameters for one modulator instance
///
/// Reference configuration (HackRF at 2.4 MS/s):
/// - 48 kHz audio, 1200 baud Bell 202 tones (40 samples per bit)
/// - 5 kHz FM deviation
/// - x50 polyphase interpolation to 2.4 MHz
#[derive(Debug, Clone, PartialEq)]
pub struct TxConfig {
    pub audio_sample_rate: u32,
    pub baud_rate: u32,
    pub mark_hz: f32,
    pub space_hz: f32,
    /// Peak amplitude of the AFSK waveform
    pub afsk_gain: f32,
    pub lead_silence_ms: u32,
    pub trail_silence_ms: u32,
    /// Zero bits sent ahead of the flags (alternating tones after NRZI)
    pub sync_zeros: usize,
    /// Number of leading flag octets (acts as TX delay)
    pub preamble_flags: usize,
    pub max_deviation_hz: f32,
    pub interpolation: usize,
    pub transition: TransitionBand,
    /// Audio samples fed through FM + interpolation per step
    pub chunk_size: usize,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            audio_sample_rate: 48_000,
            baud_rate: 1200,
            mark_hz: 1200.0,
            space_hz: 2200.0,
            afsk_gain: 0.5,
            lead_silence_ms: 500,
            trail_silence_ms: 500,
            sync_zeros: 20,
            preamble_flags: 100,
            max_deviation_hz: 5000.0,
            interpolation: 50,
            transition: TransitionBand::default(),
            chunk_size: 4096,
        }
    }
}

impl TxConfig {
    pub fn samples_per_bit(&self) -> usize {
        (self.audio_sample_rate / self.baud_rate) as usize
    }

    /// FM phase increment per unit of audio amplitude (rad/sample)
    pub fn sensitivity(&self) -> f32 {
        2.0 * PI * self.max_deviation_hz / self.audio_sample_rate as f32
    }

    pub fn output_sample_rate(&self) -> u64 {
        self.audio_sample_rate as u64 * self.interpolation as u64
    }

    pub fn lead_silence_samples(&self) -> usize {
        ms_to_samples(self.lead_silence_ms, self.audio_sample_rate)
    }

    pub fn trail_silence_samples(&self) -> usize {
        ms_to_samples(self.trail_silence_ms, self.audio_sample_rate)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio_sample_rate == 0 || self.baud_rate == 0 {
            return Err(AprsError::InvalidConfig(
                "Sample rate and baud rate must be > 0".to_string(),
            ));
        }
        if self.audio_sample_rate % self.baud_rate != 0 {
            return Err(AprsError::InvalidConfig(format!(
                "Sample rate {} is not a multiple of baud rate {}",
                self.audio_sample_rate, self.baud_rate
            )));
        }

        let nyquist = self.audio_sample_rate as f32 / 2.0;
        for (name, freq) in [("mark", self.mark_hz), ("space", self.space_hz)] {
            if !(freq > 0.0 && freq < nyquist) {
                return Err(AprsError::InvalidConfig(format!(
                    "{} tone {} Hz must lie in (0, {}) Hz",
                    name, freq, nyquist
                )));
            }
        }

        if !(self.afsk_gain > 0.0 && self.afsk_gain <= 1.0) {
            return Err(AprsError::InvalidConfig(format!(
                "AFSK gain {} must lie in (0, 1]",
                self.afsk_gain
            )));
        }
        if !(self.max_deviation_hz > 0.0) {
            return Err(AprsError::InvalidConfig(
                "FM deviation must be > 0".to_string(),
            ));
        }
        if self.interpolation == 0 {
            return Err(AprsError::InvalidConfig(
                "Interpolation factor must be > 0".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(AprsError::InvalidConfig(
                "Chunk size must be > 0".to_string(),
            ));
        }
        if self.preamble_flags == 0 {
            return Err(AprsError::InvalidConfig(
                "At least one leading flag is required".to_string(),
            ));
        }

        self.transition.validate()
    }
}

fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}
