use std::fmt;

use greatwire_format::FormatError;
use greatwire_rpc::RpcError;
use greatwire_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
/// The device rejected a command and reported an error number.
pub const DEVICE_ERROR: i32 = 40;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_code(err: &TransportError) -> i32 {
    match err {
        TransportError::DeviceNotFound(_) => FAILURE,
        TransportError::Timeout => TIMEOUT,
        _ => TRANSPORT_ERROR,
    }
}

pub fn rpc_code(err: &RpcError) -> i32 {
    if err.is_usage_error() {
        return USAGE;
    }
    match err {
        RpcError::CommandFailed { .. } => DEVICE_ERROR,
        RpcError::Transport(err) => transport_code(err),
        RpcError::MalformedCancelResponse { .. } => TRANSPORT_ERROR,
        RpcError::Format { .. } => DATA_INVALID,
        RpcError::Discovery { source, .. } => rpc_code(source),
        _ => INTERNAL,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    CliError::new(transport_code(&err), format!("{context}: {err}"))
}

pub fn rpc_error(context: &str, err: RpcError) -> CliError {
    CliError::new(rpc_code(&err), format!("{context}: {err}"))
}

pub fn format_error(context: &str, err: FormatError) -> CliError {
    CliError::usage(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_failures_map_to_device_error() {
        let err = RpcError::CommandFailed {
            class: 0x10,
            verb: 1,
            rpc: "leds.toggle".to_string(),
            code: 22,
            name: Some("EINVAL"),
            cause: TransportError::Stalled,
        };
        assert_eq!(rpc_code(&err), DEVICE_ERROR);

        let wrapped = RpcError::Discovery {
            stage: "listing classes",
            source: Box::new(err),
        };
        assert_eq!(rpc_code(&wrapped), DEVICE_ERROR);
    }

    #[test]
    fn transport_failures() {
        let timeout = RpcError::Transport(TransportError::Timeout);
        assert_eq!(rpc_code(&timeout), TIMEOUT);
        assert_eq!(
            rpc_code(&RpcError::Transport(TransportError::Disconnected)),
            TRANSPORT_ERROR
        );
        let missing = TransportError::DeviceNotFound(None);
        assert_eq!(transport_code(&missing), FAILURE);
    }

    #[test]
    fn usage_and_data_errors() {
        assert_eq!(rpc_code(&RpcError::UnknownClass("leds".to_string())), USAGE);
        let truncated = RpcError::Format {
            rpc: "exec".to_string(),
            source: FormatError::PayloadTruncated {
                format: "<I".to_string(),
                field: 0,
                needed: 4,
                available: 2,
            },
        };
        assert_eq!(rpc_code(&truncated), DATA_INVALID);
    }
}
