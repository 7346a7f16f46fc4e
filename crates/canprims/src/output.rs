use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use canprims_frame::CanFrame;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Every interpretation of a payload; the receiver knows which one applies.
#[derive(Serialize, Debug, PartialEq)]
struct Decoded {
    short: u16,
    long: u32,
    float: Option<f32>,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    id: u8,
    can_id: String,
    extended: bool,
    len: usize,
    data: String,
    decoded: &'a Decoded,
    timestamp: String,
}

fn decode(frame: &CanFrame) -> Decoded {
    let message = frame.to_message();
    let float = message.float();
    Decoded {
        short: message.short(),
        long: message.long(),
        float: (!float.is_nan()).then_some(float),
    }
}

pub fn print_frame(frame: &CanFrame, format: OutputFormat) {
    let decoded = decode(frame);
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                id: frame.identifier(),
                can_id: format!("{:#x}", frame.raw_id()),
                extended: frame.is_extended(),
                len: frame.len(),
                data: hex(frame.data()),
                decoded: &decoded,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "CAN ID", "LEN", "DATA", "SHORT", "LONG", "FLOAT"])
                .add_row(vec![
                    frame.identifier().to_string(),
                    format!("{:#x}", frame.raw_id()),
                    frame.len().to_string(),
                    hex(frame.data()),
                    decoded.short.to_string(),
                    decoded.long.to_string(),
                    float_text(decoded.float),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "id={} can_id={:#x} len={} data=[{}] short={} long={} float={}",
                frame.identifier(),
                frame.raw_id(),
                frame.len(),
                hex(frame.data()),
                decoded.short,
                decoded.long,
                float_text(decoded.float)
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.data());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn float_text(value: Option<f32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use canprims_frame::{pack_float, pack_short};

    use super::*;

    #[test]
    fn hex_is_space_separated() {
        assert_eq!(hex(&[0x2a, 0x00, 0xff]), "2a 00 ff");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn short_payload_has_no_float() {
        let frame = CanFrame::from_message(&pack_short(5, 0xABCD)).unwrap();
        assert_eq!(
            decode(&frame),
            Decoded {
                short: 0xABCD,
                long: 0,
                float: None
            }
        );
    }

    #[test]
    fn float_payload_decodes() {
        let frame = CanFrame::from_message(&pack_float(42, 3.14)).unwrap();
        assert_eq!(decode(&frame).float, Some(3.14));
    }
}
