use greatwire_format::FormatError;
use greatwire_transport::TransportError;

/// Errors that can occur while issuing commands to a device.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// A format string was malformed, or arguments or a response did not
    /// match it.
    #[error("{rpc}: {source}")]
    Format {
        rpc: String,
        #[source]
        source: FormatError,
    },

    /// The encoded command does not fit in a single frame.
    #[error("command too long ({size} bytes, max {max})")]
    CommandTooLong { size: usize, max: usize },

    /// The device reported that the command failed.
    #[error("{rpc} (class {class:#x}, verb {verb:#x}) failed on the device: {}", errno_text(.code, .name))]
    CommandFailed {
        class: u32,
        verb: u32,
        rpc: String,
        code: u32,
        name: Option<&'static str>,
        #[source]
        cause: TransportError,
    },

    /// Transport failure not signaled by the device.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The cancel transaction returned something other than an error number.
    #[error("malformed cancel response ({len} bytes, expected 4)")]
    MalformedCancelResponse { len: usize },

    /// No class with this name is known.
    #[error("unknown class {0:?}")]
    UnknownClass(String),

    /// The class has no verb with this name.
    #[error("class {class:?} has no verb {verb:?}")]
    UnknownVerb { class: String, verb: String },

    /// A core introspection step failed, so no API could be discovered.
    #[error("discovery failed while {stage}: {source}")]
    Discovery {
        stage: &'static str,
        #[source]
        source: Box<RpcError>,
    },
}

impl RpcError {
    pub(crate) fn format(rpc: &str, source: FormatError) -> Self {
        RpcError::Format {
            rpc: rpc.to_string(),
            source,
        }
    }

    /// The device error number, if the device rejected the command.
    pub fn device_code(&self) -> Option<u32> {
        match self {
            RpcError::CommandFailed { code, .. } => Some(*code),
            RpcError::Discovery { source, .. } => source.device_code(),
            _ => None,
        }
    }

    /// Whether the caller supplied a bad format or arguments.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            RpcError::CommandTooLong { .. }
                | RpcError::UnknownClass(_)
                | RpcError::UnknownVerb { .. }
                | RpcError::Format {
                    source: FormatError::Syntax { .. }
                        | FormatError::ArgumentCount { .. }
                        | FormatError::TypeMismatch { .. }
                        | FormatError::OutOfRange { .. }
                        | FormatError::LengthMismatch { .. }
                        | FormatError::GroupCount { .. },
                    ..
                }
        )
    }
}

fn errno_text(code: &u32, name: &Option<&'static str>) -> String {
    match name {
        Some(name) => format!("error {code} ({name})"),
        None => format!("error {code}"),
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
