use aprs_sdr_core::{AprsModulator, Packet, SampleFormat, TxConfig};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmModulator {
    inner: AprsModulator,
}

#[wasm_bindgen]
impl WasmModulator {
    /// Modulator with the reference configuration (48 kHz audio, x50 to 2.4 MS/s)
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmModulator, JsValue> {
        AprsModulator::new(TxConfig::default())
            .map(|modulator| WasmModulator { inner: modulator })
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Encode a packet into interleaved signed 8-bit I/Q
    /// Returns an Int8Array
    #[wasm_bindgen]
    pub fn encode_s8(&self, source: &str, destination: &str, path: &str, info: &str) -> Result<Vec<i8>, JsValue> {
        let bytes = self.render(source, destination, path, info, SampleFormat::IqS8)?;
        Ok(bytes.into_iter().map(|b| b as i8).collect())
    }

    /// Encode a packet into interleaved f32 I/Q
    /// Returns a Float32Array
    #[wasm_bindgen]
    pub fn encode_f32(&self, source: &str, destination: &str, path: &str, info: &str) -> Result<Vec<f32>, JsValue> {
        let bytes = self.render(source, destination, path, info, SampleFormat::IqF32)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    /// AFSK audio at 48 kHz, playable through an AudioContext
    #[wasm_bindgen]
    pub fn waveform(&self, source: &str, destination: &str, path: &str, info: &str) -> Result<Vec<f32>, JsValue> {
        let packet = Packet::new(source, info.as_bytes())
            .with_destination(destination)
            .with_path(path);
        self.inner
            .waveform(&packet)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(getter)]
    pub fn output_sample_rate(&self) -> f64 {
        self.inner.config().output_sample_rate() as f64
    }
}

impl WasmModulator {
    fn render(
        &self,
        source: &str,
        destination: &str,
        path: &str,
        info: &str,
        format: SampleFormat,
    ) -> Result<Vec<u8>, JsValue> {
        let packet = Packet::new(source, info.as_bytes())
            .with_destination(destination)
            .with_path(path);
        self.inner
            .render(&packet, format)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Signed 8-bit I/Q for one packet to `APRS`; the output length is the
/// array length
#[wasm_bindgen]
pub fn gen_iq_s8(callsign: &str, path: &str, info: &str) -> Result<Vec<i8>, JsValue> {
    aprs_sdr_core::gen_iq_s8(callsign, path, info).map_err(|e| JsValue::from_str(&e.to_string()))
}
