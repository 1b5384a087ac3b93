// src/main.rs
//
// Command-line entry point.
//
//   sniffpipe -d /dev/ttyUSB0 -f /tmp/sniff
//   wireshark -k -i /tmp/sniff

use std::path::PathBuf;

use clap::Parser;
use sniffpipe_lib::capture::{FrameEncoding, LinkType, OddDigitPolicy};
use sniffpipe_lib::io::serial::list_serial_ports;
use sniffpipe_lib::{tlog, BridgeSettings};

#[derive(Parser, Debug)]
#[command(name = "sniffpipe", version)]
#[command(about = "Serial monitor that pipes captured packets to Wireshark")]
struct Args {
    /// TOML settings file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device to connect to (default: /dev/ttyUSB0)
    #[arg(short, long)]
    device: Option<String>,

    /// Baudrate used for communication (default: 2000000)
    #[arg(short, long)]
    baudrate: Option<u32>,

    /// FIFO queue used to pipe captured traffic (default: /tmp/sniff)
    #[arg(short = 'f', long)]
    fifo_path: Option<PathBuf>,

    /// Packet payload encoding
    #[arg(short, long, value_enum)]
    encoding: Option<FrameEncoding>,

    /// pcap link type (default follows the encoding)
    #[arg(short, long, value_enum)]
    link_type: Option<LinkType>,

    /// Handling of hex payloads with an odd number of digits
    #[arg(long, value_enum)]
    odd_digits: Option<OddDigitPolicy>,

    /// Also append console lines to this file
    #[arg(short, long)]
    serial_log: Option<PathBuf>,

    /// Write the bridge's own log to a timestamped file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    fn apply(&self, settings: &mut BridgeSettings) {
        if let Some(device) = &self.device {
            settings.device = device.clone();
        }
        if let Some(baud) = self.baudrate {
            settings.baud_rate = baud;
        }
        if let Some(path) = &self.fifo_path {
            settings.fifo_path = path.clone();
        }
        if let Some(encoding) = self.encoding {
            settings.frame_encoding = encoding;
        }
        if let Some(link_type) = self.link_type {
            settings.link_type = Some(link_type);
        }
        if let Some(policy) = self.odd_digits {
            settings.odd_digit_policy = policy;
        }
        if let Some(path) = &self.serial_log {
            settings.serial_log = Some(path.clone());
        }
        if let Some(dir) = &self.log_dir {
            settings.log_dir = Some(dir.clone());
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.list_ports {
        match list_serial_ports() {
            Ok(ports) if ports.is_empty() => println!("No serial ports found"),
            Ok(ports) => {
                for port in ports {
                    println!("{}", port.describe());
                }
            }
            Err(e) => {
                tlog!("[main] {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let mut settings = match &args.config {
        Some(path) => match BridgeSettings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tlog!("[main] Unable to load settings: {}", e);
                std::process::exit(1);
            }
        },
        None => BridgeSettings::default(),
    };
    args.apply(&mut settings);

    match sniffpipe_lib::run(settings).await {
        Ok(_) => {}
        Err(e) => {
            tlog!("[main] {}", e);
            std::process::exit(1);
        }
    }
}
