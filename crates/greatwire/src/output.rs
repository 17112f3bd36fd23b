use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use greatwire_format::Reply;
use serde::Serialize;

use crate::values::{display, named_results, reply_to_json, reply_values, result_name};

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

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Print a decoded reply, naming results where names are known.
pub fn print_reply(reply: &Reply, names: Option<&[String]>, format: OutputFormat) {
    match format {
        OutputFormat::Json => match names {
            Some(_) => print_json(&named_results(reply, names)),
            None => print_json(&reply_to_json(reply)),
        },
        OutputFormat::Table => {
            let mut table = new_table(vec!["RESULT", "VALUE"]);
            for (index, value) in reply_values(reply).iter().enumerate() {
                table.add_row(vec![result_name(names, index), display(value)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (index, value) in reply_values(reply).iter().enumerate() {
                println!("{}: {}", result_name(names, index), display(value));
            }
        }
        OutputFormat::Raw => {
            for value in reply_values(reply) {
                println!("{}", display(value));
            }
        }
    }
}
