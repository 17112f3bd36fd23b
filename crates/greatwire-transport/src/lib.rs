//! Command transports for libgreat devices.
//!
//! This is the lowest layer of greatwire. A [`Transport`] moves encoded
//! command frames to a device and responses back, and performs the
//! out-of-band cancel transaction. Two implementations are provided:
//! - [`UsbTransport`] drives real hardware over vendor control transfers
//!   (`usb` feature)
//! - [`Loopback`] emulates a device in-process for tests and tooling

pub mod error;
pub mod frame;
pub mod loopback;
pub mod traits;

#[cfg(feature = "usb")]
pub mod usb;

pub use error::{Result, TransportError};
pub use frame::{CommandFlags, CommandFrame, ERRNO_SIZE, HEADER_SIZE, MAX_COMMAND_SIZE};
pub use loopback::{CommandHandler, Loopback, LoopbackStats, Operation};
pub use traits::Transport;

#[cfg(feature = "usb")]
pub use usb::{DeviceSelector, UsbTransport};
