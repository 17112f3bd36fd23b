//! In-process device emulator.
//!
//! [`Loopback`] plays the device side of the command protocol against a
//! [`CommandHandler`], so everything above the transport can be exercised
//! without hardware. It behaves the way libgreat firmware does:
//! - a written frame is executed immediately and its response held
//! - a failed command latches its error number and stalls the next read
//! - a cancel returns the latched error number and clears it
//! - a read flagged `REPEAT_LAST` re-executes the stored frame

use std::collections::VecDeque;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::frame::{CommandFlags, CommandFrame, ERRNO_SIZE, MAX_COMMAND_SIZE};
use crate::traits::Transport;

/// Error number latched for malformed or out-of-order requests.
const EINVAL: u32 = 22;

/// Device-side implementation of a set of verbs.
pub trait CommandHandler {
    /// Execute one command. `Err` carries the error number the device
    /// reports when the command is cancelled.
    fn handle(&mut self, class: u32, verb: u32, payload: &[u8])
        -> std::result::Result<Vec<u8>, u32>;
}

impl<F> CommandHandler for F
where
    F: FnMut(u32, u32, &[u8]) -> std::result::Result<Vec<u8>, u32>,
{
    fn handle(
        &mut self,
        class: u32,
        verb: u32,
        payload: &[u8],
    ) -> std::result::Result<Vec<u8>, u32> {
        self(class, verb, payload)
    }
}

/// A transport operation, for targeting injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Write,
    Read,
    Cancel,
}

/// Transfer counters kept by a [`Loopback`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    /// Command frames written.
    pub writes: usize,
    /// Response reads, including repeats.
    pub reads: usize,
    /// Reads that re-executed the previous frame.
    pub repeats: usize,
    /// Cancel transactions.
    pub cancels: usize,
    /// Commands the handler executed.
    pub executions: usize,
}

/// A [`Transport`] backed by an in-process [`CommandHandler`].
#[derive(Debug)]
pub struct Loopback<H> {
    handler: H,
    last_frame: Option<CommandFrame>,
    response: Option<Bytes>,
    errno: u32,
    failures: VecDeque<(Operation, TransportError)>,
    stats: LoopbackStats,
}

impl<H: CommandHandler> Loopback<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            last_frame: None,
            response: None,
            errno: 0,
            failures: VecDeque::new(),
            stats: LoopbackStats::default(),
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn stats(&self) -> LoopbackStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = LoopbackStats::default();
    }

    /// Fail the next `operation` with `error` instead of performing it.
    ///
    /// Failures are queued and consumed in order by operations of the
    /// matching kind.
    pub fn inject(&mut self, operation: Operation, error: TransportError) {
        self.failures.push_back((operation, error));
    }

    fn take_failure(&mut self, operation: Operation) -> Result<()> {
        let position = self.failures.iter().position(|(op, _)| *op == operation);
        match position.and_then(|index| self.failures.remove(index)) {
            Some((_, error)) => {
                debug!(?operation, %error, "injected transport failure");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn fail(&mut self, errno: u32) -> TransportError {
        self.errno = errno;
        self.response = None;
        TransportError::Stalled
    }

    fn execute(&mut self, frame: &CommandFrame) {
        self.stats.executions += 1;
        match self.handler.handle(frame.class, frame.verb, &frame.payload) {
            Ok(response) => {
                trace!(
                    class = frame.class,
                    verb = frame.verb,
                    len = response.len(),
                    "loopback executed"
                );
                self.errno = 0;
                self.response = Some(Bytes::from(response));
            }
            Err(errno) => {
                debug!(
                    class = frame.class,
                    verb = frame.verb,
                    errno,
                    "loopback command failed"
                );
                self.errno = errno;
                self.response = None;
            }
        }
    }
}

impl<H: CommandHandler> Transport for Loopback<H> {
    fn write_command(
        &mut self,
        frame: &[u8],
        flags: CommandFlags,
        _timeout: Duration,
    ) -> Result<()> {
        self.take_failure(Operation::Write)?;
        self.stats.writes += 1;

        if frame.len() > MAX_COMMAND_SIZE {
            return Err(self.fail(EINVAL));
        }
        let Some(command) = CommandFrame::decode(frame) else {
            return Err(self.fail(EINVAL));
        };

        self.execute(&command);
        self.last_frame = Some(command);

        if flags.contains(CommandFlags::SKIP_RESPONSE) && self.errno != 0 {
            self.response = None;
            return Err(TransportError::Stalled);
        }
        Ok(())
    }

    fn read_response(
        &mut self,
        max_length: usize,
        flags: CommandFlags,
        _timeout: Duration,
    ) -> Result<Bytes> {
        self.take_failure(Operation::Read)?;
        self.stats.reads += 1;

        if flags.contains(CommandFlags::REPEAT_LAST) {
            self.stats.repeats += 1;
            let Some(command) = self.last_frame.clone() else {
                return Err(self.fail(EINVAL));
            };
            self.execute(&command);
        }

        if self.errno != 0 {
            return Err(TransportError::Stalled);
        }
        match self.response.take() {
            Some(mut response) => {
                response.truncate(max_length);
                Ok(response)
            }
            None => Err(self.fail(EINVAL)),
        }
    }

    fn cancel(&mut self, _timeout: Duration) -> Result<Bytes> {
        self.take_failure(Operation::Cancel)?;
        self.stats.cancels += 1;

        let mut errno = BytesMut::with_capacity(ERRNO_SIZE);
        errno.put_u32_le(self.errno);
        self.errno = 0;
        self.response = None;
        Ok(errno.freeze())
    }
}
