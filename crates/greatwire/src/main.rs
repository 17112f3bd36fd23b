mod cmd;
mod exit;
mod logging;
mod output;
mod values;

use clap::Parser;
use greatwire_transport::usb::{DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID};
use greatwire_transport::DeviceSelector;

use crate::cmd::{parse_usb_id, Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "greatwire", version, about = "RPC client for libgreat devices")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Log level of the greatwire crates (stderr). GREATWIRE_LOG overrides it.
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Serial number of the device to open.
    #[arg(long, env = "GREATWIRE_SERIAL", global = true)]
    serial: Option<String>,

    /// USB vendor id (hex).
    #[arg(
        long,
        env = "GREATWIRE_VID",
        value_parser = parse_usb_id,
        global = true
    )]
    vid: Option<u16>,

    /// USB product id (hex).
    #[arg(
        long,
        env = "GREATWIRE_PID",
        value_parser = parse_usb_id,
        global = true
    )]
    pid: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn device(&self) -> DeviceSelector {
        DeviceSelector {
            vendor_id: self.vid.unwrap_or(DEFAULT_VENDOR_ID),
            product_id: self.pid.unwrap_or(DEFAULT_PRODUCT_ID),
            serial_number: self.serial.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let context = Context {
        format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
        device: cli.device(),
    };

    match cmd::run(cli.command, &context) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
