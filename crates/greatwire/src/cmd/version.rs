use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("greatwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: greatwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("GREATWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: usb={}, cli=true", cfg!(feature = "usb"));
    println!(
        "usb_ids: {:04x}:{:04x}",
        greatwire_transport::usb::DEFAULT_VENDOR_ID,
        greatwire_transport::usb::DEFAULT_PRODUCT_ID
    );

    Ok(SUCCESS)
}
