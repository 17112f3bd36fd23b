use greatwire_format::{encode, Format, Value};

use crate::cmd::{Context, ExecArgs};
use crate::exit::{format_error, rpc_error, CliResult, SUCCESS};
use crate::output::print_reply;
use crate::values::parse_args;

pub fn run(args: ExecArgs, context: &Context) -> CliResult<i32> {
    let values = parse_args(args.args.as_deref())?;
    check(&args.in_format, &args.out_format, &values)?;

    let mut session = context.open()?;
    let reply = session
        .execute_command(
            args.class,
            args.verb,
            &args.in_format,
            &args.out_format,
            &values,
            &args.options(),
        )
        .map_err(|err| {
            rpc_error(
                &format!("command {:#x}:{:#x}", args.class, args.verb),
                err,
            )
        })?;

    print_reply(&reply, None, context.format);
    Ok(SUCCESS)
}

/// Reject malformed formats and arguments before touching the device.
fn check(in_format: &str, out_format: &str, values: &[Value]) -> CliResult<()> {
    let in_format = Format::parse(in_format).map_err(|err| format_error("--in-format", err))?;
    Format::parse(out_format).map_err(|err| format_error("--out-format", err))?;
    encode(&in_format, values).map_err(|err| format_error("--args", err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    #[test]
    fn malformed_formats_are_usage_errors() {
        let err = check("<(I", "", &[]).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("--in-format"));

        let err = check("", "<*I*I", &[]).unwrap_err();
        assert!(err.message.starts_with("--out-format"));
    }

    #[test]
    fn arguments_are_checked_against_the_format() {
        let args = [Value::UInt(1), Value::UInt(2)];
        assert!(check("<BH", "<I", &args).is_ok());
        let err = check("<B", "", &[Value::UInt(256)]).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(check("<B", "", &[]).is_err());
    }
}
