use crate::error::{AprsError, Result};
use num_complex::Complex32;
use std::fmt;
use std::str::FromStr;

/// Output sample representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Interleaved signed 8-bit I/Q (HackRF native)
    IqS8,
    /// Interleaved little-endian f32 I/Q
    IqF32,
    /// Mono little-endian f32 audio, before FM modulation
    PcmF32,
}

impl SampleFormat {
    /// Bytes per output sample (one I/Q pair, or one audio sample)
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::IqS8 => 2,
            SampleFormat::IqF32 => 8,
            SampleFormat::PcmF32 => 4,
        }
    }

    pub fn is_iq(&self) -> bool {
        !matches!(self, SampleFormat::PcmF32)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::IqS8 => "s8",
            SampleFormat::IqF32 => "f32",
            SampleFormat::PcmF32 => "pcm",
        }
    }
}

impl FromStr for SampleFormat {
    type Err = AprsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s8" => Ok(SampleFormat::IqS8),
            "f32" => Ok(SampleFormat::IqF32),
            "pcm" => Ok(SampleFormat::PcmF32),
            other => Err(AprsError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scale each component by 127 and truncate toward zero (saturating)
pub fn f32_to_s8(samples: &[Complex32]) -> Vec<i8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.push((s.re * i8::MAX as f32) as i8);
        out.push((s.im * i8::MAX as f32) as i8);
    }
    out
}

/// Serialize complex samples as interleaved I/Q bytes
pub fn format_iq(samples: &[Complex32], format: SampleFormat) -> Result<Vec<u8>> {
    match format {
        SampleFormat::IqS8 => Ok(f32_to_s8(samples).into_iter().map(|b| b as u8).collect()),
        SampleFormat::IqF32 => {
            let mut out = Vec::with_capacity(samples.len() * 8);
            for s in samples {
                out.extend_from_slice(&s.re.to_le_bytes());
                out.extend_from_slice(&s.im.to_le_bytes());
            }
            Ok(out)
        }
        SampleFormat::PcmF32 => Err(AprsError::UnsupportedFormat(
            "pcm carries audio, not I/Q samples".to_string(),
        )),
    }
}

/// Serialize audio samples as little-endian f32
pub fn format_audio(waveform: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(waveform.len() * 4);
    for s in waveform {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
