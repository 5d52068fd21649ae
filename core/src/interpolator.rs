use crate::error::{AprsError, Result};
use crate::ringbuffer::RingBuffer;
use num_complex::Complex32;

/// Polyphase FIR interpolator
///
/// The prototype low-pass (designed at the output rate) is zero-padded to a
/// multiple of the factor and split into `factor` branches; branch `j` holds
/// taps `j, j + factor, j + 2 * factor, ...`. Every input position with a
/// full window of `taps_per_phase` samples produces one output per branch,
/// which is equivalent to zero-stuffing and filtering but skips the zeros.
pub struct FirInterpolator {
    factor: usize,
    taps_per_phase: usize,
    /// Branch coefficients, time-reversed so each output is a forward dot
    /// product over the input window
    branches: Vec<Vec<f32>>,
}

impl FirInterpolator {
    pub fn new(factor: usize, taps: &[f32]) -> Result<Self> {
        if factor == 0 {
            return Err(AprsError::InvalidConfig(
                "Interpolation factor must be > 0".to_string(),
            ));
        }
        if taps.is_empty() {
            return Err(AprsError::InvalidConfig(
                "Interpolation filter has no taps".to_string(),
            ));
        }

        let taps_per_phase = (taps.len() + factor - 1) / factor;
        let branches = (0..factor)
            .map(|j| {
                (0..taps_per_phase)
                    .rev()
                    .map(|k| taps.get(k * factor + j).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        Ok(Self {
            factor,
            taps_per_phase,
            branches,
        })
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Input samples of history each output needs
    pub fn taps_per_phase(&self) -> usize {
        self.taps_per_phase
    }

    /// Interpolate every full window in `input`
    ///
    /// Returns the output samples and how many input samples are fully
    /// consumed; the caller evicts those from the buffer. The trailing
    /// `taps_per_phase - 1` samples stay buffered until more input (or a
    /// [`flush`](Self::flush)) arrives.
    pub fn interpolate(&self, input: &RingBuffer<Complex32>) -> (Vec<Complex32>, usize) {
        if input.len() < self.taps_per_phase {
            return (Vec::new(), 0);
        }

        let window: Vec<Complex32> = input.iter().collect();
        let consumed = window.len() - self.taps_per_phase + 1;
        let mut output = Vec::with_capacity(consumed * self.factor);

        for span in window.windows(self.taps_per_phase) {
            for branch in &self.branches {
                let acc = span
                    .iter()
                    .zip(branch.iter())
                    .fold(Complex32::new(0.0, 0.0), |acc, (&x, &h)| acc + x * h);
                output.push(acc);
            }
        }

        (output, consumed)
    }

    /// End-of-message flush: run the buffered tail through the filter
    /// against trailing zeros, then empty the buffer
    ///
    /// After a flush the total output of the stream is exactly
    /// `input_len * factor` samples.
    pub fn flush(&self, input: &mut RingBuffer<Complex32>) -> Result<Vec<Complex32>> {
        let padding = vec![Complex32::new(0.0, 0.0); self.taps_per_phase - 1];
        input.extend_from_slice(&padding)?;
        let (output, consumed) = self.interpolate(input);
        input.remove(consumed);
        input.clear();
        Ok(output)
    }
}

/// Reference interpolator: insert `factor - 1` zeros before every sample,
/// then run the full FIR over the result. Only complete windows are output.
pub fn naive_interpolate(input: &[Complex32], factor: usize, taps: &[f32]) -> Vec<Complex32> {
    let mut taps = taps.to_vec();
    let remainder = taps.len() % factor;
    if remainder != 0 {
        taps.resize(taps.len() + factor - remainder, 0.0);
    }

    let mut stuffed = Vec::with_capacity(input.len() * factor);
    for &sample in input {
        stuffed.extend(std::iter::repeat(Complex32::new(0.0, 0.0)).take(factor - 1));
        stuffed.push(sample);
    }

    if stuffed.len() < taps.len() {
        return Vec::new();
    }
    stuffed
        .windows(taps.len())
        .map(|span| {
            span.iter()
                .zip(taps.iter().rev())
                .fold(Complex32::new(0.0, 0.0), |acc, (&x, &h)| acc + x * h)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{design_lowpass, TransitionBand};
    use rand::{Rng, SeedableRng};

    fn random_input(len: usize, seed: u64) -> Vec<Complex32> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..len)
            .map(|_| Complex32::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    fn fill(samples: &[Complex32]) -> RingBuffer<Complex32> {
        let mut ring = RingBuffer::new(samples.len() + 256);
        ring.extend_from_slice(samples).unwrap();
        ring
    }

    #[test]
    fn test_polyphase_split() {
        let taps: Vec<f32> = (1..=7).map(|t| t as f32).collect();
        let interp = FirInterpolator::new(3, &taps).unwrap();
        assert_eq!(interp.taps_per_phase(), 3);
        // taps padded to 9: branch 0 = [1, 4, 7], branch 1 = [2, 5, 0], branch 2 = [3, 6, 0]
        assert_eq!(interp.branches[0], vec![7.0, 4.0, 1.0]);
        assert_eq!(interp.branches[1], vec![0.0, 5.0, 2.0]);
        assert_eq!(interp.branches[2], vec![0.0, 6.0, 3.0]);
    }

    #[test]
    fn test_matches_naive_reference() {
        let factor = 4;
        let taps = design_lowpass(factor, &TransitionBand::default());
        let input = random_input(120, 42);

        let interp = FirInterpolator::new(factor, &taps).unwrap();
        let (fast, consumed) = interp.interpolate(&fill(&input));
        assert_eq!(consumed, input.len() - interp.taps_per_phase() + 1);
        assert_eq!(fast.len(), consumed * factor);

        let slow = naive_interpolate(&input, factor, &taps);
        assert!(!slow.is_empty());
        for (i, (a, b)) in slow.iter().zip(fast.iter()).enumerate() {
            assert!((a - b).norm() < 1e-4, "mismatch at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_short_input_waits_for_more() {
        let taps = design_lowpass(4, &TransitionBand::default());
        let interp = FirInterpolator::new(4, &taps).unwrap();
        let input = random_input(interp.taps_per_phase() - 1, 3);
        let (output, consumed) = interp.interpolate(&fill(&input));
        assert!(output.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_streaming_equals_one_shot() {
        let factor = 5;
        let taps = design_lowpass(factor, &TransitionBand::default());
        let interp = FirInterpolator::new(factor, &taps).unwrap();
        let input = random_input(700, 9);

        let (one_shot, _) = interp.interpolate(&fill(&input));

        let mut ring = RingBuffer::new(64 + interp.taps_per_phase());
        let mut streamed = Vec::new();
        for chunk in input.chunks(64) {
            ring.extend_from_slice(chunk).unwrap();
            let (out, consumed) = interp.interpolate(&ring);
            ring.remove(consumed);
            streamed.extend(out);
        }

        assert_eq!(streamed.len(), one_shot.len());
        for (a, b) in streamed.iter().zip(one_shot.iter()) {
            assert!((a - b).norm() < 1e-5);
        }
    }

    #[test]
    fn test_flush_yields_exact_length() {
        let factor = 6;
        let taps = design_lowpass(factor, &TransitionBand::default());
        let interp = FirInterpolator::new(factor, &taps).unwrap();

        for len in [0, 1, interp.taps_per_phase() - 1, interp.taps_per_phase(), 333] {
            let input = random_input(len, len as u64);
            let mut ring = RingBuffer::new(len + 2 * interp.taps_per_phase());
            ring.extend_from_slice(&input).unwrap();

            let (mut output, consumed) = interp.interpolate(&ring);
            ring.remove(consumed);
            output.extend(interp.flush(&mut ring).unwrap());

            assert_eq!(output.len(), len * factor, "input length {}", len);
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn test_unity_passband_gain() {
        let factor = 8;
        let taps = design_lowpass(factor, &TransitionBand::default());
        let interp = FirInterpolator::new(factor, &taps).unwrap();
        let input = vec![Complex32::new(1.0, 0.0); 200];
        let (output, _) = interp.interpolate(&fill(&input));
        for s in output {
            assert!((s.re - 1.0).abs() < 0.01 && s.im.abs() < 1e-6);
        }
    }

    #[test]
    fn test_rejects_degenerate_parameters() {
        assert!(FirInterpolator::new(0, &[1.0]).is_err());
        assert!(FirInterpolator::new(4, &[]).is_err());
    }
}
