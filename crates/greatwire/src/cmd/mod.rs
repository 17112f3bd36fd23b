use std::time::Duration;

use clap::{Args, Subcommand};
use greatwire_rpc::{CallOptions, Session, SessionConfig};
use greatwire_transport::{DeviceSelector, UsbTransport};
use tracing::debug;

use crate::exit::{transport_error, CliResult};
use crate::output::OutputFormat;

pub mod apis;
pub mod call;
pub mod exec;
pub mod info;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the board's identity: board id, version, part id and serial.
    Info,
    /// Discover and list the device's classes and verbs.
    Apis(ApisArgs),
    /// Invoke a discovered verb by class and verb name.
    Call(CallArgs),
    /// Invoke a verb by number with explicit format strings.
    Exec(ExecArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand that talks to a device.
#[derive(Debug)]
pub struct Context {
    pub format: OutputFormat,
    pub device: DeviceSelector,
}

impl Context {
    pub fn open(&self) -> CliResult<Session<UsbTransport>> {
        debug!(device = %self.device, "opening device");
        greatwire::open(&self.device, SessionConfig::default())
            .map_err(|err| transport_error("failed to open device", err))
    }
}

pub fn run(command: Command, context: &Context) -> CliResult<i32> {
    match command {
        Command::Info => info::run(context),
        Command::Apis(args) => apis::run(args, context),
        Command::Call(args) => call::run(args, context),
        Command::Exec(args) => exec::run(args, context),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ApisArgs {
    /// Only list this class.
    #[arg(long)]
    pub class: Option<String>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Class name, e.g. `leds`.
    pub class: String,
    /// Verb name, e.g. `toggle`.
    pub verb: String,
    /// Arguments as a JSON array, e.g. '[1, "x", [1, 2]]'.
    #[arg(long)]
    pub args: Option<String>,
    /// Command timeout (e.g. 5s, 500ms).
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Class number (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_number)]
    pub class: u32,
    /// Verb number (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_number)]
    pub verb: u32,
    /// Format string for the arguments.
    #[arg(long, default_value = "")]
    pub in_format: String,
    /// Format string for the response.
    #[arg(long, default_value = "")]
    pub out_format: String,
    /// Arguments as a JSON array.
    #[arg(long)]
    pub args: Option<String>,
    /// Largest response to read; 0 sends the command without reading one.
    #[arg(long)]
    pub max_response: Option<usize>,
    /// Command timeout (e.g. 5s, 500ms).
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,
}

impl ExecArgs {
    pub fn options(&self) -> CallOptions {
        CallOptions {
            timeout: self.timeout,
            max_response_length: self.max_response,
            ..CallOptions::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
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
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub fn parse_number(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

/// USB ids are conventionally written in hex; the `0x` prefix is optional.
pub fn parse_usb_id(input: &str) -> Result<u16, String> {
    let input = input.trim();
    let hex = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    u16::from_str_radix(hex, 16).map_err(|_| format!("invalid USB id: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn numbers_accept_hex() {
        assert_eq!(parse_number("16").unwrap(), 16);
        assert_eq!(parse_number("0x20").unwrap(), 0x20);
        assert!(parse_number("0xzz").is_err());
        assert_eq!(parse_usb_id("1d50").unwrap(), 0x1d50);
        assert_eq!(parse_usb_id("0x60E6").unwrap(), 0x60e6);
        assert!(parse_usb_id("10000").is_err());
    }
}
