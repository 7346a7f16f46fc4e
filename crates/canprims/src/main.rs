mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "canprims", version, about = "CAN bus primitives CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "canprims",
            "send",
            "vcan0",
            "--id",
            "42",
            "--float",
            "-3.5",
            "--arbitration-id",
            "0x321",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.interface, "vcan0");
                assert_eq!(args.id, 42);
                assert_eq!(args.float, Some(-3.5));
                assert_eq!(args.arbitration_id, Some(0x321));
                assert_eq!(args.repeat, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_value_args() {
        let err = Cli::try_parse_from([
            "canprims", "send", "vcan0", "--id", "1", "--short", "2", "--long", "3",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_out_of_range_id() {
        let err = Cli::try_parse_from(["canprims", "send", "vcan0", "--id", "256"])
            .expect_err("id must fit in a byte");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_listen_with_ids() {
        let cli = Cli::try_parse_from([
            "canprims", "listen", "vcan1", "--ids", "1,7", "--count", "3",
        ])
        .expect("listen args should parse");

        match cli.command {
            Command::Listen(args) => {
                assert_eq!(args.interface, "vcan1");
                assert_eq!(args.ids, Some(vec![1, 7]));
                assert_eq!(args.count, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "canprims",
            "version",
            "--format",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("global flags should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_level, LogLevel::Debug);
    }
}
