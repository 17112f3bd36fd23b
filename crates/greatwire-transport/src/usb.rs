//! USB backend: libgreat commands as vendor control transfers.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use rusb::{DeviceHandle, Direction, GlobalContext, Recipient, RequestType};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::frame::{CommandFlags, ERRNO_SIZE, MAX_COMMAND_SIZE};
use crate::traits::Transport;

/// Vendor request number carrying libgreat commands.
pub const REQUEST_NUMBER: u8 = 0x65;

/// `wValue` of a request that executes a command.
pub const VALUE_EXECUTE: u16 = 0;

/// `wValue` of a request that cancels the active command.
pub const VALUE_CANCEL: u16 = 0xDEAD;

/// USB vendor id of GreatFET-family boards.
pub const DEFAULT_VENDOR_ID: u16 = 0x1d50;

/// USB product id of GreatFET-family boards.
pub const DEFAULT_PRODUCT_ID: u16 = 0x60e6;

/// Serial numbers are reported zero-padded to this many characters.
const SERIAL_NUMBER_LENGTH: usize = 32;

/// Which USB device to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Serial number to match; shorter values are zero-padded to match
    /// the device descriptor.
    pub serial_number: Option<String>,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            serial_number: None,
        }
    }
}

impl DeviceSelector {
    pub fn with_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    /// The serial number as the device descriptor reports it.
    pub fn padded_serial_number(&self) -> Option<String> {
        let width = SERIAL_NUMBER_LENGTH;
        self.serial_number
            .as_deref()
            .map(|serial| format!("{serial:0>width$}"))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)?;
        if let Some(serial) = &self.serial_number {
            write!(f, " serial {serial}")?;
        }
        Ok(())
    }
}

impl From<rusb::Error> for TransportError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Pipe => TransportError::Stalled,
            rusb::Error::Timeout => TransportError::Timeout,
            rusb::Error::NoDevice => TransportError::Disconnected,
            other => TransportError::Usb(other),
        }
    }
}

/// A libgreat device reached over USB control transfers.
pub struct UsbTransport {
    handle: DeviceHandle<GlobalContext>,
    serial_number: Option<String>,
}

impl UsbTransport {
    /// Open the first device matching `selector`.
    pub fn open(selector: &DeviceSelector) -> Result<Self> {
        let wanted_serial = selector.padded_serial_number();

        for device in rusb::devices()?.iter() {
            let Ok(desc) = device.device_descriptor() else {
                continue;
            };
            if desc.vendor_id() != selector.vendor_id || desc.product_id() != selector.product_id {
                continue;
            }

            let mut handle = match device.open() {
                Ok(handle) => handle,
                Err(err) => {
                    debug!(
                        bus = device.bus_number(),
                        address = device.address(),
                        %err,
                        "skipping device"
                    );
                    continue;
                }
            };

            let serial_number = desc
                .serial_number_string_index()
                .filter(|&index| index != 0)
                .and_then(|index| handle.read_string_descriptor_ascii(index).ok());
            if let Some(wanted) = &wanted_serial {
                if serial_number.as_ref() != Some(wanted) {
                    continue;
                }
            }

            let config = device.config_descriptor(0)?.number();
            if handle.active_configuration()? != config {
                handle.set_active_configuration(config)?;
            }

            debug!(
                bus = device.bus_number(),
                address = device.address(),
                serial = serial_number.as_deref().unwrap_or("-"),
                "opened device"
            );
            return Ok(Self {
                handle,
                serial_number,
            });
        }

        Err(TransportError::DeviceNotFound(Some(selector.to_string())))
    }

    /// The serial number string the device reported, if any.
    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    fn request_type(direction: Direction) -> u8 {
        rusb::request_type(direction, RequestType::Vendor, Recipient::Endpoint)
    }
}

impl fmt::Debug for UsbTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbTransport")
            .field("serial_number", &self.serial_number)
            .finish()
    }
}

impl Transport for UsbTransport {
    fn write_command(
        &mut self,
        frame: &[u8],
        flags: CommandFlags,
        timeout: Duration,
    ) -> Result<()> {
        trace!(len = frame.len(), flags = flags.bits(), "usb command out");
        self.handle.write_control(
            Self::request_type(Direction::Out),
            REQUEST_NUMBER,
            VALUE_EXECUTE,
            flags.bits(),
            frame,
            timeout,
        )?;
        Ok(())
    }

    fn read_response(
        &mut self,
        max_length: usize,
        flags: CommandFlags,
        timeout: Duration,
    ) -> Result<Bytes> {
        let mut buf = vec![0u8; max_length.min(MAX_COMMAND_SIZE)];
        let len = self.handle.read_control(
            Self::request_type(Direction::In),
            REQUEST_NUMBER,
            VALUE_EXECUTE,
            flags.bits(),
            &mut buf,
            timeout,
        )?;
        buf.truncate(len);
        trace!(len, flags = flags.bits(), "usb response in");
        Ok(Bytes::from(buf))
    }

    fn cancel(&mut self, timeout: Duration) -> Result<Bytes> {
        let mut buf = vec![0u8; ERRNO_SIZE];
        let len = self.handle.read_control(
            Self::request_type(Direction::In),
            REQUEST_NUMBER,
            VALUE_CANCEL,
            0,
            &mut buf,
            timeout,
        )?;
        buf.truncate(len);
        Ok(Bytes::from(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_numbers_are_zero_padded() {
        let selector = DeviceSelector::default().with_serial_number("a1b2");
        let padded = selector.padded_serial_number().unwrap();
        assert_eq!(padded.len(), 32);
        assert!(padded.ends_with("a1b2"));
        assert!(padded.starts_with("0000"));
        assert_eq!(DeviceSelector::default().padded_serial_number(), None);
    }

    #[test]
    fn selector_display() {
        assert_eq!(DeviceSelector::default().to_string(), "1d50:60e6");
        let selector = DeviceSelector::default().with_serial_number("42");
        assert_eq!(selector.to_string(), "1d50:60e6 serial 42");
    }

    #[test]
    fn libusb_errors_map_to_transport_errors() {
        assert!(matches!(
            TransportError::from(rusb::Error::Pipe),
            TransportError::Stalled
        ));
        assert!(matches!(
            TransportError::from(rusb::Error::Timeout),
            TransportError::Timeout
        ));
        assert!(matches!(
            TransportError::from(rusb::Error::NoDevice),
            TransportError::Disconnected
        ));
        assert!(matches!(
            TransportError::from(rusb::Error::Access),
            TransportError::Usb(rusb::Error::Access)
        ));
    }

    #[test]
    fn request_types() {
        assert_eq!(UsbTransport::request_type(Direction::Out), 0x42);
        assert_eq!(UsbTransport::request_type(Direction::In), 0xC2);
    }
}
