// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use clap::{Parser, Subcommand, ValueEnum};
use serialport::{DataBits, Parity, StopBits};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tpdd::drive::{Drive, DriveConfig, DriveError, Ready, Reply};
use tpdd::protocol::{OpenMode, SearchForm};
use tpdd::response::{Classification, ResponseKind};
use tpdd::serial::{list_ports, RealSerialPort};

#[derive(Parser)]
#[command(name = "tpdd")]
#[command(about = "TPDD Base Protocol client for Tandy Portable Disk Drives", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value = "19200")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name="BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name="BITS")]
    stop_bits: u8,

    /// Quiet time in milliseconds that ends a reply
    #[arg(long, default_value = "30", value_name = "MS")]
    gap: u64,

    /// Milliseconds to wait for a reply to start
    #[arg(long, default_value = "1000", value_name = "MS")]
    timeout: u64,

    /// Reject replies with a bad length or checksum
    #[arg(long)]
    strict: bool,

    /// Terminate every command with a carriage return
    #[arg(long)]
    legacy_cr: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,
    #[command(flatten)]
    Drive(DriveCommand),
}

#[derive(Subcommand)]
enum DriveCommand {
    /// Query drive status
    Status,
    /// Query drive condition
    Condition,
    /// Send a directory search request
    Dir {
        #[arg(long, value_enum, default_value = "first")]
        form: Form,
        /// Filename (at most 24 bytes)
        #[arg(default_value = "")]
        name: String,
    },
    /// Open a file on the drive
    Open {
        name: String,
        #[arg(long, value_enum, default_value = "read")]
        mode: Mode,
    },
    /// Close the open file
    Close,
    /// Format the disk
    Format,
    /// Delete a file from the disk
    Erase {
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Form {
    Reference,
    First,
    Next,
    Previous,
    End,
}

impl From<Form> for SearchForm {
    fn from(form: Form) -> Self {
        match form {
            Form::Reference => SearchForm::Reference,
            Form::First => SearchForm::First,
            Form::Next => SearchForm::Next,
            Form::Previous => SearchForm::Previous,
            Form::End => SearchForm::End,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Write,
    Append,
    Read,
}

impl From<Mode> for OpenMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Write => OpenMode::WriteNew,
            Mode::Append => OpenMode::WriteAppend,
            Mode::Read => OpenMode::Read,
        }
    }
}

fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn init_logging(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let command = match cli.command {
        Commands::Ports => {
            print_ports();
            return;
        }
        Commands::Drive(command) => command,
    };

    let port = cli.port.as_deref().unwrap_or_else(|| fail("--port is required"));
    let data_bits = parse_data_bits(cli.data_bits).unwrap_or_else(|e| fail(e));
    let parity = parse_parity(&cli.parity).unwrap_or_else(|e| fail(e));
    let stop_bits = parse_stop_bits(cli.stop_bits).unwrap_or_else(|e| fail(e));

    println!("Opening serial port: {}", port);
    println!("Settings: {} baud, {:?}, {:?}, {:?}", cli.baud, data_bits, parity, stop_bits);

    let config = DriveConfig {
        timeout: Duration::from_millis(cli.timeout),
        gap: Duration::from_millis(cli.gap),
        strict: cli.strict,
        legacy_cr: cli.legacy_cr,
        ..DriveConfig::default()
    };

    let connect = || -> Result<Drive<Ready>, DriveError> {
        let serial_port = RealSerialPort::open(port, cli.baud, data_bits, parity, stop_bits)?;
        Drive::new(Box::new(serial_port), config).wake()
    };

    let mut drive = match connect() {
        Ok(drive) => drive,
        Err(e) => fail(format!("Failed to connect to drive: {}", e)),
    };

    match run(&mut drive, command) {
        Ok(reply) => print_reply(&reply),
        Err(e) => fail(e),
    }
}

fn print_ports() {
    match list_ports() {
        Ok(ports) if ports.is_empty() => println!("No serial ports found"),
        Ok(ports) => {
            println!("Available serial ports:");
            for port in ports {
                println!("  {}", port);
            }
        }
        Err(e) => fail(format!("Failed to list serial ports: {}", e)),
    }
}

fn run(drive: &mut Drive<Ready>, command: DriveCommand) -> Result<Reply, DriveError> {
    match command {
        DriveCommand::Status => drive.status(),
        DriveCommand::Condition => drive.condition(),
        DriveCommand::Dir { form, name } => drive.directory(form.into(), &name),
        DriveCommand::Open { name, mode } => drive.open(&name, mode.into()),
        DriveCommand::Close => drive.close(),
        DriveCommand::Format => drive.format(),
        DriveCommand::Erase { name } => drive.erase(&name),
    }
}

fn print_reply(reply: &Reply) {
    println!("Response: {}", reply.classification);
    println!("Bytes: {:02X?}", reply.raw);

    let Some(frame) = &reply.frame else { return };
    match reply.classification {
        Classification::Known(ResponseKind::DriveCondition) => {
            if let Some(condition) = frame.data().first() {
                println!("Condition: {:08b}", condition);
            }
        }
        Classification::Known(ResponseKind::DirectoryMore) if frame.data().len() == 28 => {
            // filename(24) | attribute(1) | size(2, big endian) | free sectors(1)
            let data = frame.data();
            let name = String::from_utf8_lossy(&data[..24]);
            let size = u16::from_be_bytes([data[25], data[26]]);
            if name.trim().is_empty() {
                println!("No entry");
            } else {
                println!("Entry: {} ({} bytes)", name.trim_end(), size);
            }
            println!("Free sectors: {}", data[27]);
        }
        _ => {}
    }
}
