use std::{
    io::{self, BufWriter},
    path::PathBuf,
    str::FromStr,
};

use argh::FromArgs;
use hbm_axi::BurstType;
use hbm_engine::Mode;

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help"))]
/// Exercise the channels of an HBM stack with AXI4 bursts and report the
/// bandwidth they reach
pub struct Opts {
    /// issue single-beat bursts, ignores the burst lengths
    #[argh(switch, short = 's', long = "single")]
    pub single: bool,

    /// AXI burst type (INCR | FIXED | WRAP). default = INCR
    #[argh(
        option,
        short = 'm',
        long = "burstmode",
        default = "BurstType::Incr"
    )]
    pub burst: BurstType,

    /// word offset between the regions of neighbouring channels, reduces
    /// bank conflicts
    #[argh(
        option,
        short = 'o',
        long = "bank-offset",
        default = "0",
        from_str_fn(parse_number)
    )]
    pub bank_offset: u32,

    /// number of channels in the stack. default = 1
    #[argh(option, long = "channels", default = "1")]
    pub channels: usize,

    /// enabled channels, one bit each. default = every channel
    #[argh(option, long = "mask", from_str_fn(parse_number))]
    pub mask: Option<u32>,

    /// read | write. default = write
    #[argh(
        option,
        long = "mode",
        default = "Mode::Write",
        from_str_fn(parse_mode)
    )]
    pub mode: Mode,

    /// word address of the first channel's region
    #[argh(option, long = "address", default = "0", from_str_fn(parse_number))]
    pub address: u32,

    /// beats per burst. default = 16
    #[argh(option, long = "burst-len", default = "16")]
    pub burst_len: u16,

    /// beats in the last burst of a sequence, 0 keeps the burst length
    #[argh(option, long = "last-burst-len", default = "0")]
    pub last_burst_len: u16,

    /// bursts per sequence. default = 1
    #[argh(option, long = "quantity", default = "1")]
    pub burst_quantity: u32,

    /// ticks to pause between sequences
    #[argh(option, long = "delay", default = "0")]
    pub delay_bound: u32,

    /// base value of the write payload
    #[argh(option, long = "pattern", default = "0", from_str_fn(parse_number))]
    pub data_pattern: u32,

    /// ticks to run before stopping. default = 10000
    #[argh(option, long = "cycles", default = "10_000")]
    pub cycles: u64,

    /// ticks the memory takes to return read data
    #[argh(option, long = "read-latency", default = "0")]
    pub read_latency: u32,

    /// ticks the memory takes to answer a write burst
    #[argh(option, long = "write-latency", default = "0")]
    pub write_latency: u32,

    /// clock the engines run at, in MHz. default = 250
    #[argh(option, long = "clock-mhz", default = "250.0")]
    pub clock_mhz: f64,

    /// run a JSON test plan instead of the flags above
    #[argh(option, long = "plan")]
    pub plan: Option<PathBuf>,

    /// report destination, default is stdout
    #[argh(option, long = "output", default = "OutputFile::Stdout")]
    pub output: OutputFile,

    /// report format (text | json). default = text
    #[argh(option, long = "format", default = "Format::Text")]
    pub format: Format,

    /// silence everything but errors
    #[argh(switch, short = 'q', long = "quiet")]
    pub quiet: bool,

    /// enables debug logging
    #[argh(switch, long = "debug-logging")]
    pub debug_logging: bool,

    #[argh(subcommand)]
    pub command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
pub enum Command {
    Run(CommandRun),
    CsrMap(CommandCsrMap),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "run")]
/// [default] Run the engines and report their bandwidth
pub struct CommandRun {}

#[derive(FromArgs)]
#[argh(subcommand, name = "csr-map")]
/// Print the host register map as JSON
pub struct CommandCsrMap {}

fn parse_number(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("`{s}` is not a 32-bit number: {e}"))
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    match s.to_ascii_lowercase().as_str() {
        "read" => Ok(Mode::Read),
        "write" => Ok(Mode::Write),
        _ => Err(format!("unknown mode `{s}`, expected read or write")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl FromStr for Format {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            _ => Err(format!("unknown format `{s}`, expected text or json")),
        }
    }
}

/// Possible choices for output streams. Used by the `--output` option.
/// * "-" and "<out>" are treated as stdout.
/// * "<err>" is treated as stderr.
/// * "<null>" is treated as a null output stream.
/// * All other strings are treated as file paths.
#[derive(Debug, Clone)]
pub enum OutputFile {
    Null,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl FromStr for OutputFile {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" | "<out>" => Ok(OutputFile::Stdout),
            "<err>" => Ok(OutputFile::Stderr),
            "<null>" => Ok(OutputFile::Null),
            _ => Ok(OutputFile::File(PathBuf::from(s))),
        }
    }
}

impl OutputFile {
    pub fn get_write(&self) -> io::Result<Box<dyn io::Write>> {
        Ok(match self {
            OutputFile::Stdout => Box::new(BufWriter::new(io::stdout())),
            OutputFile::Stderr => Box::new(BufWriter::new(io::stderr())),
            OutputFile::File(path) => {
                Box::new(BufWriter::new(std::fs::File::create(path)?))
            }
            OutputFile::Null => Box::new(io::sink()),
        })
    }
}
