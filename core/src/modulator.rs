use crate::afsk::AfskModulator;
use crate::ax25::{Frame, Preamble};
use crate::config::{TxConfig, DEFAULT_DESTINATION, DEFAULT_PATH};
use crate::error::Result;
use crate::filter::design_lowpass;
use crate::fm::FmModulator;
use crate::format::{format_audio, format_iq, SampleFormat};
use crate::interpolator::FirInterpolator;
use crate::nrzi::encode_nrzi;
use crate::ringbuffer::RingBuffer;
use crate::BitStream;
use log::{debug, trace};
use num_complex::Complex32;
use std::io::Write;

/// Caller-supplied fields of one transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub source: &'a str,
    pub destination: &'a str,
    /// Comma-separated digipeater path
    pub path: &'a str,
    pub info: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Packet to the default destination over the default path
    pub fn new(source: &'a str, info: &'a [u8]) -> Self {
        Self {
            source,
            destination: DEFAULT_DESTINATION,
            path: DEFAULT_PATH,
            info,
        }
    }

    pub fn with_destination(mut self, destination: &'a str) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_path(mut self, path: &'a str) -> Self {
        self.path = path;
        self
    }
}

/// APRS transmit pipeline: AX.25 frame -> NRZI -> AFSK -> FM -> x`factor`
/// interpolation -> sample format
///
/// The interpolation filter is designed once in [`AprsModulator::new`] and
/// reused for every packet. Each call is independent; no state carries over
/// between packets.
pub struct AprsModulator {
    config: TxConfig,
    afsk: AfskModulator,
    interpolator: FirInterpolator,
}

impl AprsModulator {
    pub fn new(config: TxConfig) -> Result<Self> {
        config.validate()?;

        let taps = design_lowpass(config.interpolation, &config.transition);
        let interpolator = FirInterpolator::new(config.interpolation, &taps)?;
        debug!(
            "Interpolation filter: {} taps, {} per phase, x{} to {} Hz",
            taps.len(),
            interpolator.taps_per_phase(),
            config.interpolation,
            config.output_sample_rate()
        );

        Ok(Self {
            afsk: AfskModulator::new(&config),
            interpolator,
            config,
        })
    }

    pub fn config(&self) -> &TxConfig {
        &self.config
    }

    pub fn frame(&self, packet: &Packet<'_>) -> Result<Frame> {
        let frame = Frame::new(packet.source, packet.destination, packet.path, packet.info)?;
        debug!(
            "Frame {} ({} octets, FCS {:#06x})",
            frame,
            frame.to_bytes().len(),
            frame.fcs()
        );
        Ok(frame)
    }

    /// Frame bits with the configured sync zeros and leading flags
    pub fn frame_bits(&self, packet: &Packet<'_>) -> Result<BitStream> {
        let preamble = Preamble {
            sync_zeros: self.config.sync_zeros,
            flags: self.config.preamble_flags,
        };
        let bits = self.frame(packet)?.to_bits(&preamble);
        trace!(
            "Packet: {}",
            bits.iter().map(|&b| if b { '1' } else { '0' }).collect::<String>()
        );
        Ok(bits)
    }

    /// NRZI line levels ready for the AFSK stage
    pub fn encode_bits(&self, packet: &Packet<'_>) -> Result<BitStream> {
        Ok(encode_nrzi(&self.frame_bits(packet)?))
    }

    /// AFSK audio including the configured lead and trail silence
    pub fn waveform(&self, packet: &Packet<'_>) -> Result<Vec<f32>> {
        let levels = self.encode_bits(packet)?;
        let wave = self.afsk.render(&levels);
        debug!(
            "AFSK: {} bits, {} audio samples ({:.3} s)",
            levels.len(),
            wave.len(),
            wave.len() as f64 / self.config.audio_sample_rate as f64
        );
        Ok(wave)
    }

    /// Bytes `modulate` writes for a waveform of `waveform_len` samples
    pub fn output_len(&self, waveform_len: usize, format: SampleFormat) -> usize {
        if format.is_iq() {
            waveform_len * self.config.interpolation * format.bytes_per_sample()
        } else {
            waveform_len * format.bytes_per_sample()
        }
    }

    /// FM modulate and interpolate `waveform` chunk by chunk into `sink`
    ///
    /// Memory use is bounded by the chunk size, not the waveform length.
    /// PCM output bypasses FM and interpolation and writes the audio as is.
    /// Returns the number of bytes written.
    pub fn modulate<W: Write>(
        &self,
        waveform: &[f32],
        format: SampleFormat,
        sink: &mut W,
    ) -> Result<usize> {
        if !format.is_iq() {
            let bytes = format_audio(waveform);
            sink.write_all(&bytes)?;
            sink.flush()?;
            return Ok(bytes.len());
        }

        let history = self.interpolator.taps_per_phase() - 1;
        let chunk_size = self.config.chunk_size;
        let mut buffer = RingBuffer::new(chunk_size.max(history + 1) + history);
        let mut fm = FmModulator::new(self.config.sensitivity());
        let mut written = 0;

        for (index, chunk) in waveform.chunks(chunk_size).enumerate() {
            fm.modulate_into(chunk, &mut buffer)?;
            let (samples, consumed) = self.interpolator.interpolate(&buffer);
            buffer.remove(consumed);
            written += write_iq(sink, &samples, format)?;
            trace!(
                "Chunk {}: {} audio samples, {} consumed, {} I/Q out, {} buffered",
                index,
                chunk.len(),
                consumed,
                samples.len(),
                buffer.len()
            );
        }

        let tail = self.interpolator.flush(&mut buffer)?;
        written += write_iq(sink, &tail, format)?;
        sink.flush()?;

        debug!(
            "Modulated {} audio samples into {} bytes of {}",
            waveform.len(),
            written,
            format
        );
        Ok(written)
    }

    /// Encode and modulate one packet into `sink`. Address and path errors
    /// are reported before anything is written.
    pub fn write_packet<W: Write>(
        &self,
        packet: &Packet<'_>,
        format: SampleFormat,
        sink: &mut W,
    ) -> Result<usize> {
        let wave = self.waveform(packet)?;
        self.modulate(&wave, format, sink)
    }

    /// Encode and modulate one packet into an owned buffer
    pub fn render(&self, packet: &Packet<'_>, format: SampleFormat) -> Result<Vec<u8>> {
        let wave = self.waveform(packet)?;
        let mut out = Vec::with_capacity(self.output_len(wave.len(), format));
        self.modulate(&wave, format, &mut out)?;
        Ok(out)
    }
}

fn write_iq<W: Write>(sink: &mut W, samples: &[Complex32], format: SampleFormat) -> Result<usize> {
    let bytes = format_iq(samples, format)?;
    sink.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Signed 8-bit I/Q for one packet with the reference configuration and
/// destination `APRS`
///
/// The result is always `waveform_len * 50 * 2` bytes long.
pub fn gen_iq_s8(callsign: &str, path: &str, info: &str) -> Result<Vec<i8>> {
    let modulator = AprsModulator::new(TxConfig::default())?;
    let packet = Packet::new(callsign, info.as_bytes()).with_path(path);
    let bytes = modulator.render(&packet, SampleFormat::IqS8)?;
    Ok(bytes.into_iter().map(|b| b as i8).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ax25::decode_frame;
    use crate::error::AprsError;
    use crate::nrzi::decode_nrzi;

    /// Fast configuration for unit tests: short preamble, x4 interpolation
    fn test_config() -> TxConfig {
        TxConfig {
            lead_silence_ms: 10,
            trail_silence_ms: 10,
            sync_zeros: 4,
            preamble_flags: 2,
            interpolation: 4,
            chunk_size: 256,
            ..TxConfig::default()
        }
    }

    #[test]
    fn test_bits_carry_the_frame() {
        let modulator = AprsModulator::new(test_config()).unwrap();
        let packet = Packet::new("KD9WPR", b"Hello");
        let levels = modulator.encode_bits(&packet).unwrap();
        assert_eq!(levels.len(), 4 + 16 + 296 + 8);

        let frame = decode_frame(&decode_nrzi(&levels)).unwrap();
        assert_eq!(frame, modulator.frame(&packet).unwrap());
    }

    #[test]
    fn test_output_length_for_every_format() {
        let modulator = AprsModulator::new(test_config()).unwrap();
        let packet = Packet::new("KD9WPR", b"Hello");
        let wave_len = modulator.waveform(&packet).unwrap().len();
        assert_eq!(wave_len, 480 + 324 * 40 + 480);

        for format in [SampleFormat::IqS8, SampleFormat::IqF32, SampleFormat::PcmF32] {
            let bytes = modulator.render(&packet, format).unwrap();
            assert_eq!(bytes.len(), modulator.output_len(wave_len, format), "{}", format);
        }
        assert_eq!(modulator.output_len(wave_len, SampleFormat::IqS8), wave_len * 4 * 2);
    }

    #[test]
    fn test_chunk_size_does_not_change_output() {
        let packet = Packet::new("N0CALL", b"!4903.50N/07201.75W-").with_path("WIDE2-2");
        let small = AprsModulator::new(TxConfig {
            chunk_size: 37,
            ..test_config()
        })
        .unwrap();
        let large = AprsModulator::new(TxConfig {
            chunk_size: 100_000,
            ..test_config()
        })
        .unwrap();

        let a = small.render(&packet, SampleFormat::IqF32).unwrap();
        let b = large.render(&packet, SampleFormat::IqF32).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.chunks(4).zip(b.chunks(4)) {
            let x = f32::from_le_bytes([x[0], x[1], x[2], x[3]]);
            let y = f32::from_le_bytes([y[0], y[1], y[2], y[3]]);
            assert!((x - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_invalid_address_writes_nothing() {
        let modulator = AprsModulator::new(test_config()).unwrap();
        let mut sink = Vec::new();
        let result = modulator.write_packet(
            &Packet::new("TOOLONGCALL", b"x"),
            SampleFormat::IqS8,
            &mut sink,
        );
        assert!(matches!(result, Err(AprsError::AddressError { .. })));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_info_and_path() {
        let modulator = AprsModulator::new(test_config()).unwrap();
        let packet = Packet::new("KD9WPR", b"").with_path("");
        let frame = modulator.frame(&packet).unwrap();
        assert!(frame.digipeaters.is_empty());
        assert!(frame.info.is_empty());

        let bytes = modulator.render(&packet, SampleFormat::IqS8).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_pcm_is_the_waveform() {
        let modulator = AprsModulator::new(test_config()).unwrap();
        let packet = Packet::new("KD9WPR", b"Hi");
        let wave = modulator.waveform(&packet).unwrap();
        let bytes = modulator.render(&packet, SampleFormat::PcmF32).unwrap();
        assert_eq!(bytes, format_audio(&wave));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TxConfig {
            chunk_size: 0,
            ..TxConfig::default()
        };
        assert!(matches!(
            AprsModulator::new(config),
            Err(AprsError::InvalidConfig(_))
        ));
    }
}
