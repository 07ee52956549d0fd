use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use mp3chunk::process::window::WindowConfig;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nmp3chunk ",
    env!("MP3CHUNK_VERSION"),
    "\nbuilt ",
    env!("BUILD_TIMESTAMP"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    about        = "Tools for inspecting and stream-decoding MPEG audio files",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first stalled frame).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level at which library conditions become errors.
    pub fn fail_level(&self) -> log::Level {
        if self.strict {
            log::Level::Warn
        } else {
            log::Level::Error
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode an MPEG audio file into 16-bit PCM (needs the `minimp3` feature).
    Decode(DecodeArgs),

    /// Scan frame headers and print stream information
    Info(InfoArgs),
}

/// Chunk window geometry shared by every command.
#[derive(Debug, Clone, Copy, Args)]
pub struct WindowArgs {
    /// Size of one window slot in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = 4096)]
    pub slot_size: usize,

    /// Slots decoded from before the window shifts.
    #[arg(long, value_name = "SLOTS", default_value_t = 2)]
    pub lookback: usize,

    /// Slots read ahead of the decoding position.
    #[arg(long, value_name = "SLOTS", default_value_t = 2)]
    pub lookahead: usize,
}

impl WindowArgs {
    pub fn to_config(self) -> WindowConfig {
        WindowConfig {
            slot_capacity: self.slot_size,
            lookback_slots: self.lookback,
            lookahead_slots: self.lookahead,
        }
    }
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Input MPEG audio file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file (defaults to the input with the format's extension).
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Audio format for output.
    #[arg(long, value_enum, default_value_t = AudioFormat::W64)]
    pub format: AudioFormat,

    /// Bytes of PCM requested per decode call.
    #[arg(long, value_name = "BYTES", default_value_t = 16384)]
    pub burst: usize,

    /// Byte offset to seek to before decoding.
    #[arg(long, value_name = "BYTE")]
    pub start: Option<u64>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input MPEG audio file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AudioFormat {
    /// Raw PCM (16-bit little-endian, interleaved).
    Pcm,
    /// Sony Wave64.
    W64,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Pcm => "pcm",
            AudioFormat::W64 => "w64",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ReportFormat {
    /// Aligned human-readable text.
    Text,
    /// YAML document.
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn window_flags_map_to_config() {
        let cli = Cli::parse_from([
            "mp3chunkd",
            "--strict",
            "info",
            "in.mp3",
            "--slot-size",
            "8192",
            "--lookahead",
            "1",
        ]);

        assert_eq!(cli.fail_level(), log::Level::Warn);
        let Commands::Info(args) = cli.command else {
            panic!("expected info command");
        };
        assert_eq!(
            args.window.to_config(),
            WindowConfig {
                slot_capacity: 8192,
                lookback_slots: 2,
                lookahead_slots: 1,
            }
        );
        assert_eq!(args.report, ReportFormat::Text);
    }

    #[test]
    fn decode_defaults() {
        let cli = Cli::parse_from(["mp3chunkd", "decode", "in.mp3"]);

        assert_eq!(cli.fail_level(), log::Level::Error);
        let Commands::Decode(args) = cli.command else {
            panic!("expected decode command");
        };
        assert_eq!(args.burst, 16384);
        assert_eq!(args.format, AudioFormat::W64);
        assert_eq!(args.start, None);
        assert_eq!(args.window.to_config(), WindowConfig::default());
    }
}
