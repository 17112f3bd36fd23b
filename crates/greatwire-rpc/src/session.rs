//! Command framing and the device session.

use std::thread;

use bytes::{Buf, Bytes};
use greatwire_format::{
    bytes_consumed, collapse, decode, encode, Format, FormatCache, FormatError, Reply, Value,
};
use greatwire_transport::{
    CommandFlags, CommandFrame, Transport, TransportError, ERRNO_SIZE, MAX_COMMAND_SIZE,
};
use tracing::{debug, trace, warn};

use crate::config::{CallOptions, SessionConfig};
use crate::errno::errno_name;
use crate::error::{Result, RpcError};

/// An open command channel to one device.
///
/// The session owns the transport and remembers the last command it sent.
/// When the next command is byte-for-byte identical, only a "repeat last"
/// read is issued. The memo is cleared whenever a command fails or is
/// aborted, and by [`reset`](Session::reset).
///
/// Commands are strictly sequential; the protocol has no request ids, so a
/// session shared between threads needs external locking.
#[derive(Debug)]
pub struct Session<T> {
    transport: T,
    config: SessionConfig,
    last_command: Option<CommandFrame>,
    formats: FormatCache,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            last_command: None,
            formats: FormatCache::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport. Clears the repeat memo, since the
    /// caller may change device state behind the session's back.
    pub fn transport_mut(&mut self) -> &mut T {
        self.last_command = None;
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Whether the next identical command would use the repeat path.
    pub fn has_repeat_memo(&self) -> bool {
        self.last_command.is_some()
    }

    /// Forget everything known about device state, as after a reconnect.
    pub fn reset(&mut self) {
        self.last_command = None;
    }

    /// Send a raw command and return the raw response.
    ///
    /// A `max_response_length` of zero sends the command without reading a
    /// response, and returns an empty buffer.
    pub fn send_and_receive(
        &mut self,
        class: u32,
        verb: u32,
        payload: &[u8],
        options: &CallOptions,
    ) -> Result<Bytes> {
        let rpc = format!("command {class:#x}:{verb:#x}");
        self.transact(class, verb, payload, options, &rpc)
    }

    /// Encode `args` with `in_format`, execute the command and decode the
    /// response with `out_format`.
    ///
    /// Format strings are parsed once per session and cached.
    pub fn execute_command(
        &mut self,
        class: u32,
        verb: u32,
        in_format: &str,
        out_format: &str,
        args: &[Value],
        options: &CallOptions,
    ) -> Result<Reply> {
        let rpc = format!("command {class:#x}:{verb:#x}");
        self.execute_named(class, verb, in_format, out_format, args, options, &rpc)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn execute_named(
        &mut self,
        class: u32,
        verb: u32,
        in_format: &str,
        out_format: &str,
        args: &[Value],
        options: &CallOptions,
        rpc: &str,
    ) -> Result<Reply> {
        let in_format = self.parse(in_format, rpc)?;
        let out_format = self.parse(out_format, rpc)?;
        self.execute_formats(class, verb, &in_format, &out_format, args, options, rpc)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn execute_formats(
        &mut self,
        class: u32,
        verb: u32,
        in_format: &Format,
        out_format: &Format,
        args: &[Value],
        options: &CallOptions,
        rpc: &str,
    ) -> Result<Reply> {
        let payload = encode(in_format, args).map_err(|e| RpcError::format(rpc, e))?;
        let response = self.transact(class, verb, &payload, options, rpc)?;

        let consumed =
            bytes_consumed(out_format, &response).map_err(|e| RpcError::format(rpc, e))?;
        if consumed != response.len() {
            return Err(RpcError::format(
                rpc,
                FormatError::TrailingBytes {
                    format: out_format.source().to_string(),
                    unused: response.len() - consumed,
                },
            ));
        }

        let values = decode(out_format, &response).map_err(|e| RpcError::format(rpc, e))?;
        Ok(collapse(out_format, values))
    }

    fn parse(&mut self, source: &str, rpc: &str) -> Result<std::sync::Arc<Format>> {
        self.formats
            .get_or_parse(source)
            .map_err(|e| RpcError::format(rpc, e))
    }

    fn transact(
        &mut self,
        class: u32,
        verb: u32,
        payload: &[u8],
        options: &CallOptions,
        rpc: &str,
    ) -> Result<Bytes> {
        let frame = CommandFrame::new(class, verb, Bytes::copy_from_slice(payload));
        if frame.wire_size() > MAX_COMMAND_SIZE {
            return Err(RpcError::CommandTooLong {
                size: frame.wire_size(),
                max: MAX_COMMAND_SIZE,
            });
        }

        match self.exchange(frame, options) {
            Ok(response) => Ok(response),
            Err(cause) if cause.is_device_signaled() => {
                let code = self.abort()?;
                let name = errno_name(code);
                debug!(rpc, code, name = name.unwrap_or("?"), %cause, "command failed on device");
                Err(RpcError::CommandFailed {
                    class,
                    verb,
                    rpc: rpc.to_string(),
                    code,
                    name,
                    cause,
                })
            }
            Err(err) => {
                self.last_command = None;
                Err(err.into())
            }
        }
    }

    fn exchange(
        &mut self,
        frame: CommandFrame,
        options: &CallOptions,
    ) -> std::result::Result<Bytes, TransportError> {
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let comms_timeout = options.comms_timeout.unwrap_or(self.config.comms_timeout);
        let max_length = options
            .max_response_length
            .unwrap_or(self.config.max_response_length)
            .min(MAX_COMMAND_SIZE);
        let skip_response = max_length == 0;

        let repeat = self.config.repeat_optimization
            && !skip_response
            && self.last_command.as_ref() == Some(&frame);

        debug!(
            class = frame.class,
            verb = frame.verb,
            len = frame.payload.len(),
            repeat,
            skip_response,
            "executing command"
        );

        if !repeat {
            self.last_command = None;
            let flags = if skip_response {
                CommandFlags::SKIP_RESPONSE
            } else {
                CommandFlags::empty()
            };
            let wire = frame.encode();
            trace!(bytes = ?wire.as_ref(), "command frame");
            self.transport.write_command(&wire, flags, timeout)?;
            if self.config.repeat_optimization {
                self.last_command = Some(frame);
            }
            if skip_response {
                return Ok(Bytes::new());
            }
        }

        let flags = if repeat {
            CommandFlags::REPEAT_LAST
        } else {
            CommandFlags::empty()
        };
        let response = self
            .transport
            .read_response(max_length, flags, comms_timeout)?;
        trace!(bytes = ?response.as_ref(), "command response");
        Ok(response)
    }

    /// Abort the device's current command and return its error number.
    ///
    /// The cancel transaction is retried once after
    /// [`cancel_retry_delay`](SessionConfig::cancel_retry_delay). Always
    /// clears the repeat memo.
    pub fn abort(&mut self) -> Result<u32> {
        self.last_command = None;
        let timeout = self.config.cancel_timeout;

        let response = match self.transport.cancel(timeout) {
            Ok(response) => response,
            Err(err) => match self.config.cancel_retry_delay {
                Some(delay) => {
                    warn!(%err, ?delay, "cancel failed, retrying");
                    thread::sleep(delay);
                    self.transport.cancel(timeout)?
                }
                None => return Err(err.into()),
            },
        };

        if response.len() != ERRNO_SIZE {
            return Err(RpcError::MalformedCancelResponse {
                len: response.len(),
            });
        }
        let mut errno = response;
        Ok(errno.get_u32_le())
    }
}
