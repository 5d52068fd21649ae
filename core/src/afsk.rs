use crate::config::TxConfig;
use std::f32::consts::PI;

// Bell 202 AFSK as used on 144.390 MHz APRS
//
// - Mark 1200 Hz for NRZI level 1, space 2200 Hz for level 0
// - 1200 baud, 40 samples per bit at 48 kHz
// - Continuous phase: the oscillator is never reset between bits, only the
//   per-sample increment changes

const TWO_PI: f32 = 2.0 * PI;

/// Two-tone continuous-phase FSK generator
pub struct AfskModulator {
    samples_per_bit: usize,
    mark_step: f32,
    space_step: f32,
    gain: f32,
    lead_silence: usize,
    trail_silence: usize,
}

impl AfskModulator {
    pub fn new(config: &TxConfig) -> Self {
        let sample_rate = config.audio_sample_rate as f32;
        Self {
            samples_per_bit: config.samples_per_bit(),
            mark_step: TWO_PI * config.mark_hz / sample_rate,
            space_step: TWO_PI * config.space_hz / sample_rate,
            gain: config.afsk_gain,
            lead_silence: config.lead_silence_samples(),
            trail_silence: config.trail_silence_samples(),
        }
    }

    pub fn samples_per_bit(&self) -> usize {
        self.samples_per_bit
    }

    /// Render NRZI levels as audio, exactly `bits.len() * samples_per_bit`
    /// samples long
    pub fn synthesize(&self, bits: &[bool]) -> Vec<f32> {
        let mut wave = Vec::with_capacity(bits.len() * self.samples_per_bit);
        self.synthesize_into(bits, &mut wave);
        wave
    }

    /// Same as [`synthesize`](Self::synthesize), wrapped in the configured
    /// lead and trail silence
    pub fn render(&self, bits: &[bool]) -> Vec<f32> {
        let total = self.lead_silence + bits.len() * self.samples_per_bit + self.trail_silence;
        let mut wave = Vec::with_capacity(total);
        wave.resize(self.lead_silence, 0.0);
        self.synthesize_into(bits, &mut wave);
        wave.resize(total, 0.0);
        wave
    }

    fn synthesize_into(&self, bits: &[bool], wave: &mut Vec<f32>) {
        let mut phase = 0.0f32;
        for &bit in bits {
            let step = if bit { self.mark_step } else { self.space_step };
            for _ in 0..self.samples_per_bit {
                wave.push(phase.sin() * self.gain);
                phase += step;
                if phase >= TWO_PI {
                    phase -= TWO_PI;
                }
            }
        }
    }
}

/// Convenience wrapper: synthesize without silence padding
pub fn synthesize(bits: &[bool], config: &TxConfig) -> Vec<f32> {
    AfskModulator::new(config).synthesize(bits)
}
