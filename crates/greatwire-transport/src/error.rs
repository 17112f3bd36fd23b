/// Errors that can occur while exchanging command frames with a device.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No device matched the requested selector.
    #[error("no matching device found{}", selector_suffix(.0))]
    DeviceNotFound(Option<String>),

    /// The device stalled the transfer, signaling that the command failed.
    #[error("device stalled the transfer")]
    Stalled,

    /// The transfer did not complete in time.
    #[error("transfer timed out")]
    Timeout,

    /// The device went away.
    #[error("device disconnected")]
    Disconnected,

    /// Any other libusb failure.
    #[cfg(feature = "usb")]
    #[error("USB error: {0}")]
    Usb(rusb::Error),
}

impl TransportError {
    /// Whether this error is how a device reports a failed command.
    ///
    /// Signaled failures leave the device mid-command and are answered with
    /// a cancel transaction; every other error means the link itself is
    /// unusable.
    pub fn is_device_signaled(&self) -> bool {
        matches!(self, TransportError::Stalled | TransportError::Timeout)
    }
}

fn selector_suffix(selector: &Option<String>) -> String {
    match selector {
        Some(selector) => format!(" ({selector})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signaled_errors() {
        assert!(TransportError::Stalled.is_device_signaled());
        assert!(TransportError::Timeout.is_device_signaled());
        assert!(!TransportError::Disconnected.is_device_signaled());
        assert!(!TransportError::DeviceNotFound(None).is_device_signaled());
    }

    #[test]
    fn not_found_message_names_selector() {
        let err = TransportError::DeviceNotFound(Some("1d50:60e6".to_string()));
        assert_eq!(err.to_string(), "no matching device found (1d50:60e6)");
        assert_eq!(
            TransportError::DeviceNotFound(None).to_string(),
            "no matching device found"
        );
    }
}
