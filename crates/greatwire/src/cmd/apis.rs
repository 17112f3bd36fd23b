use greatwire_rpc::{discover, ApiCollection, ClassDescriptor, DiscoveryConfig};

use crate::cmd::{ApisArgs, Context};
use crate::exit::{rpc_error, CliResult, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

pub fn run(args: ApisArgs, context: &Context) -> CliResult<i32> {
    let mut session = context.open()?;
    let api = discover(&mut session, &DiscoveryConfig::default())
        .map_err(|err| rpc_error("discovery failed", err))?;

    let classes = select(&api, args.class.as_deref())?;
    print_classes(&classes, context.format);
    Ok(SUCCESS)
}

fn select<'a>(
    api: &'a ApiCollection,
    class: Option<&str>,
) -> CliResult<Vec<&'a ClassDescriptor>> {
    match class {
        Some(name) => {
            let class = api
                .class(name)
                .map_err(|err| rpc_error("lookup failed", err))?;
            Ok(vec![class])
        }
        None => Ok(api.classes().collect()),
    }
}

fn print_classes(classes: &[&ClassDescriptor], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&classes),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CLASS", "VERB", "SIGNATURE"]);
            for class in classes {
                for verb in &class.verbs {
                    table.add_row(vec![
                        format!("{} ({:#x})", class.name, class.number),
                        format!("{:#x}", verb.verb_number),
                        verb.signature(),
                    ]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for class in classes {
                println!("{} (class {:#x}): {}", class.name, class.number, class.docs);
                for verb in &class.verbs {
                    println!("  {}", verb.signature());
                    if !verb.doc.is_empty() {
                        println!("      {}", verb.doc);
                    }
                }
                if !class.opaque_verbs.is_empty() {
                    let numbers: Vec<_> = class
                        .opaque_verbs
                        .iter()
                        .map(|n| format!("{n:#x}"))
                        .collect();
                    println!("  (not describable: {})", numbers.join(", "));
                }
            }
        }
        OutputFormat::Raw => {
            for class in classes {
                for verb in &class.verbs {
                    println!("{}.{}", class.name, verb.name);
                }
            }
        }
    }
}
