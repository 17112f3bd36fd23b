use greatwire_rpc::{discover, CallOptions, DiscoveryConfig};
use tracing::debug;

use crate::cmd::{CallArgs, Context};
use crate::exit::{rpc_error, CliResult, SUCCESS};
use crate::output::print_reply;
use crate::values::parse_args;

pub fn run(args: CallArgs, context: &Context) -> CliResult<i32> {
    let values = parse_args(args.args.as_deref())?;

    let mut session = context.open()?;
    let api = discover(&mut session, &DiscoveryConfig::default())
        .map_err(|err| rpc_error("discovery failed", err))?;
    let binding = api
        .binding(&args.class, &args.verb)
        .map_err(|err| rpc_error("lookup failed", err))?;
    debug!(signature = %binding, "invoking");

    let options = CallOptions {
        timeout: args.timeout,
        ..CallOptions::default()
    };
    let rpc = format!("{}.{}", args.class, args.verb);
    let reply = binding
        .invoke_with(&mut session, &values, &options)
        .map_err(|err| rpc_error(&rpc, err))?;

    print_reply(&reply, binding.out_param_names.as_deref(), context.format);
    Ok(SUCCESS)
}
