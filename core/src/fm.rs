use crate::error::Result;
use crate::ringbuffer::RingBuffer;
use num_complex::Complex32;
use std::f32::consts::PI;

/// Phase modulate one chunk of audio onto a unit-amplitude carrier
///
/// Each sample advances the phase by `sensitivity * sample`. Returns the
/// complex baseband samples and the phase to pass into the next chunk.
pub fn fm_modulate(chunk: &[f32], sensitivity: f32, carry_phase: f32) -> (Vec<Complex32>, f32) {
    let mut phase = carry_phase;
    let samples = chunk
        .iter()
        .map(|&sample| {
            phase = wrap_phase(phase + sample * sensitivity);
            Complex32::from_polar(1.0, phase)
        })
        .collect();
    (samples, phase)
}

/// Keep the phase in (-pi, pi]
fn wrap_phase(mut phase: f32) -> f32 {
    while phase > PI {
        phase -= 2.0 * PI;
    }
    while phase <= -PI {
        phase += 2.0 * PI;
    }
    phase
}

/// FM modulator that owns its phase between chunks
pub struct FmModulator {
    sensitivity: f32,
    phase: f32,
}

impl FmModulator {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            phase: 0.0,
        }
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn modulate(&mut self, chunk: &[f32]) -> Vec<Complex32> {
        let (samples, phase) = fm_modulate(chunk, self.sensitivity, self.phase);
        self.phase = phase;
        samples
    }

    /// Modulate `chunk` straight into the interpolator's input buffer.
    /// Fails without modulating if the chunk does not fit.
    pub fn modulate_into(&mut self, chunk: &[f32], output: &mut RingBuffer<Complex32>) -> Result<()> {
        let (samples, phase) = fm_modulate(chunk, self.sensitivity, self.phase);
        output.extend_from_slice(&samples)?;
        self.phase = phase;
        Ok(())
    }
}
