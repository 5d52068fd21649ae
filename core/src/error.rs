use thiserror::Error;

#[derive(Debug, Error)]
pub enum AprsError {
    #[error("Invalid address '{callsign}': {reason}")]
    AddressError { callsign: String, reason: String },

    #[error("Digipeater path has {0} entries (maximum 8)")]
    PathLengthError(usize),

    #[error("Information field is {0} bytes (maximum 256)")]
    InfoTooLong(usize),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Ring buffer overflow: need {needed} slots, {available} available")]
    BufferOverflow { needed: usize, available: usize },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("FCS mismatch: frame carries {expected:#06x}, computed {computed:#06x}")]
    FcsMismatch { expected: u16, computed: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AprsError>;
