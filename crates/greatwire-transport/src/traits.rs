use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;
use crate::frame::CommandFlags;

/// A byte-oriented command channel to one device.
///
/// A command is a write of an encoded frame followed, unless
/// [`CommandFlags::SKIP_RESPONSE`] was given, by a read of the response.
/// Implementations report a device-side command failure as
/// [`TransportError::Stalled`](crate::TransportError::Stalled) (or a
/// timeout); the caller then issues [`cancel`](Transport::cancel) to
/// resynchronize the device and learn why.
///
/// Only one command may be in flight at a time. Transports are not
/// required to be `Sync`; share one behind a mutex if needed.
pub trait Transport {
    /// Send an encoded command frame.
    fn write_command(&mut self, frame: &[u8], flags: CommandFlags, timeout: Duration)
        -> Result<()>;

    /// Read the response to the current command, at most `max_length` bytes.
    ///
    /// With [`CommandFlags::REPEAT_LAST`] the device re-executes the last
    /// frame it received; no write precedes such a read.
    fn read_response(
        &mut self,
        max_length: usize,
        flags: CommandFlags,
        timeout: Duration,
    ) -> Result<Bytes>;

    /// Abort the current command. Returns the raw error-number response,
    /// [`ERRNO_SIZE`](crate::ERRNO_SIZE) bytes on a well-behaved device.
    fn cancel(&mut self, timeout: Duration) -> Result<Bytes>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_command(
        &mut self,
        frame: &[u8],
        flags: CommandFlags,
        timeout: Duration,
    ) -> Result<()> {
        (**self).write_command(frame, flags, timeout)
    }

    fn read_response(
        &mut self,
        max_length: usize,
        flags: CommandFlags,
        timeout: Duration,
    ) -> Result<Bytes> {
        (**self).read_response(max_length, flags, timeout)
    }

    fn cancel(&mut self, timeout: Duration) -> Result<Bytes> {
        (**self).cancel(timeout)
    }
}
