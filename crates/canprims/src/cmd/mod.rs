use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print received frames.
    Listen(ListenArgs),
    /// Send one message, optionally repeated.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// CAN interface to bind.
    #[arg(env = "CANPRIMS_INTERFACE", default_value = "can0")]
    pub interface: String,
    /// Only print frames with these identifier bytes (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub ids: Option<Vec<u8>>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("value").args(["short", "long", "float"])))]
pub struct SendArgs {
    /// CAN interface to bind.
    #[arg(env = "CANPRIMS_INTERFACE", default_value = "can0")]
    pub interface: String,
    /// Identifier byte.
    #[arg(long)]
    pub id: u8,
    /// 16-bit value.
    #[arg(long)]
    pub short: Option<u16>,
    /// 32-bit value.
    #[arg(long)]
    pub long: Option<u32>,
    /// 32-bit float value.
    #[arg(long, allow_negative_numbers = true)]
    pub float: Option<f32>,
    /// CAN arbitration id (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_arbitration_id)]
    pub arbitration_id: Option<u32>,
    /// Number of times to send the message.
    #[arg(long, default_value = "1")]
    pub repeat: u32,
    /// Delay between repeats (e.g. 1s, 100ms).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_arbitration_id(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid arbitration id {input:?}: {err}"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
