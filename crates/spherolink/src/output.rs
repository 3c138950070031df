use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use spherolink_frame::{device_name, CatalogEntry, ResponseFrame};
use spherolink_transport::Endpoint;

#[derive(Clone, Debug, Copy, ValueEnum)]
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

#[derive(Serialize)]
struct ResponseOutput<'a> {
    kind: &'a str,
    endpoint: String,
    code: u8,
    description: &'a str,
    seq: u8,
    data_length: u8,
    payload: String,
    checksum: Option<u8>,
    timestamp: String,
}

pub fn print_response(frame: &ResponseFrame, endpoint: &Endpoint, format: OutputFormat) {
    let code = frame.response_code();
    let kind = if frame.is_async() { "async" } else { "sync" };

    match format {
        OutputFormat::Json => {
            let out = ResponseOutput {
                kind,
                endpoint: endpoint.to_string(),
                code: frame.code,
                description: code.description(),
                seq: frame.seq,
                data_length: frame.data_length,
                payload: hex_encode(&frame.payload),
                checksum: frame.checksum,
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
                .set_header(vec!["KIND", "SEQ", "CODE", "LEN", "PAYLOAD"])
                .add_row(vec![
                    kind.to_string(),
                    frame.seq.to_string(),
                    format!("0x{:02X} {}", frame.code, code.description()),
                    frame.data_length.to_string(),
                    hex_encode(&frame.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{kind} seq={} code=0x{:02X} ({}) len={} payload={}",
                frame.seq,
                frame.code,
                code,
                frame.data_length,
                hex_encode(&frame.payload)
            );
        }
        OutputFormat::Raw => {
            print_raw(&frame.payload);
        }
    }
}

#[derive(Serialize)]
struct CatalogOutput<'a> {
    name: &'a str,
    device: &'a str,
    device_id: u8,
    command_id: u8,
}

pub fn print_catalog(entries: &[CatalogEntry], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<_> = entries
                .iter()
                .map(|e| CatalogOutput {
                    name: e.name,
                    device: device_name(e.device_id),
                    device_id: e.device_id,
                    command_id: e.command_id,
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "DID", "CID", "NAME"]);
            for e in entries {
                table.add_row(vec![
                    device_name(e.device_id).to_string(),
                    format!("0x{:02X}", e.device_id),
                    format!("0x{:02X}", e.command_id),
                    e.name.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for e in entries {
                println!(
                    "{:<6} 0x{:02X}/0x{:02X} {}",
                    device_name(e.device_id),
                    e.device_id,
                    e.command_id,
                    e.name
                );
            }
        }
        OutputFormat::Raw => {
            for e in entries {
                println!("{}", e.name);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
