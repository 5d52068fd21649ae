//! APRS packet modulator for software defined radio transmitters
//!
//! Builds an AX.25 UI frame, NRZI encodes it, synthesizes 1200 baud Bell 202
//! AFSK, FM modulates the audio and interpolates it x50 with a polyphase FIR
//! to produce I/Q samples at 2.4 MS/s (HackRF native)

pub mod afsk;
pub mod ax25;
pub mod config;
pub mod error;
pub mod filter;
pub mod fm;
pub mod format;
pub mod interpolator;
pub mod modulator;
pub mod nrzi;
pub mod ringbuffer;

pub use ax25::{decode_frame, Address, Frame, Preamble};
pub use config::TxConfig;
pub use error::{AprsError, Result};
pub use format::SampleFormat;
pub use modulator::{gen_iq_s8, AprsModulator, Packet};
pub use num_complex::Complex32;

/// One bit per element, in transmission order
pub type BitStream = Vec<bool>;

// AX.25 limits
pub const MAX_DIGIPEATERS: usize = 8;
pub const MAX_INFO_LEN: usize = 256; // paclen
pub const MAX_CALLSIGN_LEN: usize = 6;
pub const MAX_SSID: u8 = 15;
