//! Windowed-sinc low-pass design for the interpolation filter
//!
//! Kaiser window with a fixed beta of 7 (roughly 70 dB stopband). The tap
//! count follows the usual estimate `(beta / 0.1102 + 8.7) * fs / (22 * tw)`
//! and is forced odd so the filter is symmetric about a centre tap.

use crate::error::{AprsError, Result};
use std::f64::consts::PI;

pub const KAISER_BETA: f64 = 7.0;

pub type FilterTaps = Vec<f32>;

/// Transition band of the interpolation filter, in units of the input
/// sample rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionBand {
    /// Fraction of the input band passed untouched
    pub fractional_bw: f32,
    /// Nyquist point of the input signal
    pub halfband: f32,
}

impl Default for TransitionBand {
    fn default() -> Self {
        Self {
            fractional_bw: 0.4,
            halfband: 0.5,
        }
    }
}

impl TransitionBand {
    pub fn transition_width(&self) -> f32 {
        self.halfband - self.fractional_bw
    }

    /// Cutoff at the middle of the transition band
    pub fn cutoff(&self) -> f32 {
        self.halfband - self.transition_width() / 2.0
    }

    pub fn validate(&self) -> Result<()> {
        let width = self.transition_width();
        if !(self.fractional_bw > 0.0 && self.halfband <= 0.5 && width > 0.0 && width < 0.5) {
            return Err(AprsError::InvalidConfig(format!(
                "Transition band (fractional_bw {}, halfband {}) must lie within (0, 0.5)",
                self.fractional_bw, self.halfband
            )));
        }
        Ok(())
    }
}

/// Zeroth-order modified Bessel function of the first kind (series expansion)
pub fn bessel_i0(x: f64) -> f64 {
    const EPSILON: f64 = 1.0e-21;
    let y = (x / 2.0) * (x / 2.0);
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut n = 1.0;
    while term > EPSILON * sum {
        term *= y / (n * n);
        sum += term;
        n += 1.0;
    }
    sum
}

pub fn compute_ntaps(sampling_freq: f64, transition_width: f64, beta: f64) -> usize {
    let attenuation = beta / 0.1102 + 8.7;
    let ntaps = (attenuation * sampling_freq / (22.0 * transition_width)) as usize;
    ntaps | 1
}

pub fn kaiser_window(ntaps: usize, beta: f64) -> Vec<f64> {
    if ntaps == 1 {
        return vec![1.0];
    }
    let scale = 1.0 / bessel_i0(beta);
    let inv_span = 1.0 / (ntaps - 1) as f64;
    (0..ntaps)
        .map(|i| {
            let x = 2.0 * i as f64 * inv_span - 1.0;
            bessel_i0(beta * (1.0 - x * x).max(0.0).sqrt()) * scale
        })
        .collect()
}

/// Kaiser-windowed sinc low-pass, scaled so the taps sum to `gain`
pub fn lowpass(gain: f64, sampling_freq: f64, cutoff_freq: f64, transition_width: f64) -> FilterTaps {
    let ntaps = compute_ntaps(sampling_freq, transition_width, KAISER_BETA);
    let window = kaiser_window(ntaps, KAISER_BETA);
    let centre = (ntaps / 2) as i64;
    let omega = 2.0 * PI * cutoff_freq / sampling_freq;

    let taps: Vec<f64> = window
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let n = i as i64 - centre;
            if n == 0 {
                omega / PI * w
            } else {
                (n as f64 * omega).sin() / (n as f64 * PI) * w
            }
        })
        .collect();

    let dc: f64 = taps.iter().sum();
    let norm = if dc.abs() < 1e-12 { gain } else { gain / dc };
    taps.iter().map(|&t| (t * norm) as f32).collect()
}

/// Interpolation filter for an upsampling `factor`: runs at the output
/// rate, cutoff and transition scaled to the input band, DC gain equal to
/// the factor to make up for the inserted zeros
pub fn design_lowpass(factor: usize, band: &TransitionBand) -> FilterTaps {
    let factor = factor as f64;
    lowpass(
        factor,
        factor,
        band.cutoff() as f64,
        band.transition_width() as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Magnitude response at `freq` (cycles per sample at the filter rate)
    fn response(taps: &[f32], freq: f64) -> f64 {
        let (mut re, mut im) = (0.0f64, 0.0f64);
        for (n, &t) in taps.iter().enumerate() {
            let arg = 2.0 * PI * freq * n as f64;
            re += t as f64 * arg.cos();
            im -= t as f64 * arg.sin();
        }
        (re * re + im * im).sqrt()
    }

    #[test]
    fn test_bessel_i0_known_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008).abs() < 1e-12);
        assert!((bessel_i0(7.0) - 168.593_908_510_289_6).abs() < 1e-9);
    }

    #[test]
    fn test_reference_tap_count() {
        assert_eq!(compute_ntaps(50.0, 0.1, KAISER_BETA), 1641);
        let taps = design_lowpass(50, &TransitionBand::default());
        assert_eq!(taps.len(), 1641);
    }

    #[test]
    fn test_taps_odd_and_symmetric() {
        let taps = design_lowpass(4, &TransitionBand::default());
        assert_eq!(taps.len() % 2, 1);
        for i in 0..taps.len() / 2 {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_dc_gain_equals_factor() {
        let taps = design_lowpass(50, &TransitionBand::default());
        let sum: f32 = taps.iter().sum();
        assert!((sum - 50.0).abs() < 1e-2, "DC gain {}", sum);
    }

    #[test]
    fn test_image_rejection() {
        let factor = 8;
        let taps = design_lowpass(factor, &TransitionBand::default());
        let dc = response(&taps, 0.0);

        // Passband edge (0.4 of the input rate) stays near unity gain
        let passband = response(&taps, 0.4 / factor as f64) / dc;
        assert!(passband > 0.95, "passband {}", passband);

        // First image (input rate - 0.4) is at least 60 dB down
        let image = response(&taps, 0.6 / factor as f64) / dc;
        assert!(image < 1e-3, "image {}", image);
    }

    #[test]
    fn test_kaiser_window_shape() {
        let window = kaiser_window(11, KAISER_BETA);
        assert!((window[5] - 1.0).abs() < 1e-12);
        assert!(window[0] < 0.01);
        assert!((window[0] - window[10]).abs() < 1e-12);
    }

    #[test]
    fn test_transition_band_validation() {
        assert!(TransitionBand::default().validate().is_ok());
        let band = TransitionBand::default();
        assert!((band.transition_width() - 0.1).abs() < 1e-6);
        assert!((band.cutoff() - 0.45).abs() < 1e-6);
        let inverted = TransitionBand {
            fractional_bw: 0.5,
            halfband: 0.4,
        };
        assert!(inverted.validate().is_err());
    }
}
