use aprs_sdr_core::ax25::bit_stuff;
use aprs_sdr_core::config::{DEFAULT_DESTINATION, DEFAULT_PATH};
use aprs_sdr_core::{AprsModulator, Frame, Packet, SampleFormat, TxConfig};
use clap::{Parser, Subcommand};
use hound::WavSpec;
use log::debug;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "aprs-sdr")]
#[command(about = "APRS packet modulator producing I/Q samples for SDR transmitters")]
struct Cli {
    /// Print debug info (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Modulate a message into a sample stream
    Encode {
        #[command(flatten)]
        station: StationArgs,

        /// Output file (default stdout)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Output format: f32 (default), s8 (HackRF), pcm
        #[arg(short, long, value_name = "FORMAT")]
        format: Option<SampleFormat>,

        /// Write pcm output as a 32-bit float WAV file
        #[arg(long)]
        wav: bool,

        /// JSON file with station and modulator settings
        #[arg(long, value_name = "CONFIG.JSON")]
        config: Option<PathBuf>,
    },

    /// Print the AX.25 frame for a message without modulating it
    Frame {
        #[command(flatten)]
        station: StationArgs,
    },
}

#[derive(clap::Args)]
struct StationArgs {
    /// Your callsign, optionally with SSID (e.g. N0CALL-9)
    #[arg(short, long)]
    callsign: Option<String>,

    /// AX.25 destination address (default APRS)
    #[arg(short, long)]
    destination: Option<String>,

    /// Digipeater path to use (default WIDE1-1,WIDE2-1)
    #[arg(short, long)]
    path: Option<String>,

    /// Information field
    #[arg(value_name = "MESSAGE")]
    message: Option<String>,
}

/// Settings file; every key is optional and command-line flags win
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    debug: Option<bool>,
    callsign: Option<String>,
    dest: Option<String>,
    path: Option<String>,
    output: Option<PathBuf>,
    info: Option<String>,
    sample_format: Option<String>,
    lead_silence_ms: Option<u32>,
    trail_silence_ms: Option<u32>,
    sync_zeros: Option<usize>,
    preamble_flags: Option<usize>,
    afsk_gain: Option<f32>,
    max_deviation_hz: Option<f32>,
    interpolation: Option<usize>,
    chunk_size: Option<usize>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    fn tx_config(&self) -> TxConfig {
        let mut tx = TxConfig::default();
        if let Some(v) = self.lead_silence_ms {
            tx.lead_silence_ms = v;
        }
        if let Some(v) = self.trail_silence_ms {
            tx.trail_silence_ms = v;
        }
        if let Some(v) = self.sync_zeros {
            tx.sync_zeros = v;
        }
        if let Some(v) = self.preamble_flags {
            tx.preamble_flags = v;
        }
        if let Some(v) = self.afsk_gain {
            tx.afsk_gain = v;
        }
        if let Some(v) = self.max_deviation_hz {
            tx.max_deviation_hz = v;
        }
        if let Some(v) = self.interpolation {
            tx.interpolation = v;
        }
        if let Some(v) = self.chunk_size {
            tx.chunk_size = v;
        }
        tx
    }
}

/// Station fields after layering flags over the settings file
struct Station {
    callsign: String,
    destination: String,
    path: String,
    info: String,
}

impl Station {
    fn resolve(args: StationArgs, file: &FileConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let callsign = args
            .callsign
            .or_else(|| file.callsign.clone())
            .ok_or("A callsign is required (-c or \"callsign\" in the config file)")?;
        let info = args
            .message
            .or_else(|| file.info.clone())
            .ok_or("A message is required (MESSAGE or \"info\" in the config file)")?;

        Ok(Self {
            callsign,
            destination: args
                .destination
                .or_else(|| file.dest.clone())
                .unwrap_or_else(|| DEFAULT_DESTINATION.to_string()),
            path: args
                .path
                .or_else(|| file.path.clone())
                .unwrap_or_else(|| DEFAULT_PATH.to_string()),
            info,
        })
    }

    fn packet(&self) -> Packet<'_> {
        Packet::new(&self.callsign, self.info.as_bytes())
            .with_destination(&self.destination)
            .with_path(&self.path)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            station,
            output,
            format,
            wav,
            config,
        } => {
            let file = match &config {
                Some(path) => FileConfig::load(path)?,
                None => FileConfig::default(),
            };
            init_logging(cli.verbose || file.debug.unwrap_or(false));
            encode_command(station, output, format, wav, &file)?
        }
        Commands::Frame { station } => {
            init_logging(cli.verbose);
            frame_command(station)?
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn encode_command(
    station: StationArgs,
    output: Option<PathBuf>,
    format: Option<SampleFormat>,
    wav: bool,
    file: &FileConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let station = Station::resolve(station, file)?;
    let format = match (format, &file.sample_format) {
        (Some(format), _) => format,
        (None, Some(name)) => name.parse()?,
        (None, None) => SampleFormat::IqF32,
    };
    let output = output.or_else(|| file.output.clone());

    let modulator = AprsModulator::new(file.tx_config())?;
    let packet = station.packet();
    debug!("{:?}", modulator.config());

    let waveform = modulator.waveform(&packet)?;

    if wav {
        let path = match (&output, format) {
            (Some(path), SampleFormat::PcmF32) => path,
            (None, _) => return Err("--wav needs an output file (-o)".into()),
            (_, other) => return Err(format!("--wav needs pcm format, got {}", other).into()),
        };
        write_wav(path, &waveform, modulator.config().audio_sample_rate)?;
        eprintln!(
            "Wrote {} audio samples at {} Hz to {}",
            waveform.len(),
            modulator.config().audio_sample_rate,
            path.display()
        );
        return Ok(());
    }

    let written = match &output {
        Some(path) => {
            let mut sink = BufWriter::new(File::create(path)?);
            modulator.modulate(&waveform, format, &mut sink)?
        }
        None => {
            let stdout = io::stdout();
            let mut sink = BufWriter::new(stdout.lock());
            modulator.modulate(&waveform, format, &mut sink)?
        }
    };

    let rate = if format.is_iq() {
        modulator.config().output_sample_rate()
    } else {
        modulator.config().audio_sample_rate as u64
    };
    eprintln!(
        "Wrote {} bytes of {} at {} Hz to {}",
        written,
        format,
        rate,
        output
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string())
    );
    Ok(())
}

fn frame_command(station: StationArgs) -> Result<(), Box<dyn std::error::Error>> {
    let station = Station::resolve(station, &FileConfig::default())?;
    let frame = Frame::new(
        &station.callsign,
        &station.destination,
        &station.path,
        station.info.as_bytes(),
    )?;
    let bytes = frame.to_bytes();
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();

    let mut out = io::stdout().lock();
    writeln!(out, "{}", frame)?;
    writeln!(out, "Octets ({}): {}", bytes.len(), hex.join(" "))?;
    writeln!(out, "FCS: {:#06X}", frame.fcs())?;
    writeln!(out, "Stuffed bits: {}", bit_stuff(&bytes).len())?;
    Ok(())
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), Box<dyn std::error::Error>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
