use greatwire_rpc::CoreApi;
use serde::Serialize;

use crate::cmd::Context;
use crate::exit::{rpc_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    board_id: u32,
    version: String,
    part_id: String,
    serial_number: String,
}

pub fn run(context: &Context) -> CliResult<i32> {
    let mut session = context.open()?;
    let mut core = CoreApi::new(&mut session);

    let out = InfoOutput {
        board_id: core
            .read_board_id()
            .map_err(|err| rpc_error("reading board id", err))?,
        version: core
            .read_version_string()
            .map_err(|err| rpc_error("reading version", err))?,
        part_id: hex_words(
            &core
                .read_part_id()
                .map_err(|err| rpc_error("reading part id", err))?,
        ),
        serial_number: hex_words(
            &core
                .read_serial_number()
                .map_err(|err| rpc_error("reading serial number", err))?,
        ),
    };

    print_info(&out, context.format);
    Ok(SUCCESS)
}

/// Board identifiers print as their words in order, each as zero-padded hex.
fn hex_words(words: &[u32]) -> String {
    words.iter().map(|word| format!("{word:08x}")).collect()
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["Board ID".to_string(), out.board_id.to_string()]);
            table.add_row(vec!["Version".to_string(), out.version.clone()]);
            table.add_row(vec!["Part ID".to_string(), out.part_id.clone()]);
            table.add_row(vec!["Serial number".to_string(), out.serial_number.clone()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Board Info:");
            println!("  Board ID:      {}", out.board_id);
            println!("  Version:       {}", out.version);
            println!("  Part ID:       {}", out.part_id);
            println!("  Serial number: {}", out.serial_number);
        }
        OutputFormat::Raw => {
            println!("{}", out.serial_number);
        }
    }
}
