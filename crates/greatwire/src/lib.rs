//! Host-side command RPC for libgreat devices (GreatFET and friends).
//!
//! libgreat boards expose their functionality as numbered classes of
//! numbered verbs, each described by a pair of format strings. greatwire
//! encodes arguments, frames commands onto the device's vendor control
//! endpoint, decodes responses and discovers the device's API at runtime.
//!
//! # Crate Structure
//!
//! - [`format`]: format strings and the payload codec
//! - [`transport`]: the transport boundary, USB backend (behind `usb`) and
//!   an in-process device emulator
//! - [`rpc`]: command sessions, bindings, the core API and discovery

/// Re-export format types.
pub mod format {
    pub use greatwire_format::*;
}

/// Re-export transport types.
pub mod transport {
    pub use greatwire_transport::*;
}

/// Re-export RPC types.
pub mod rpc {
    pub use greatwire_rpc::*;
}

pub use greatwire_format::{Reply, Value};
pub use greatwire_rpc::{discover, ApiCollection, CoreApi, RpcBinding, RpcError, Session};

/// Open the first matching USB device and start a session on it.
#[cfg(feature = "usb")]
pub fn open(
    selector: &greatwire_transport::DeviceSelector,
    config: greatwire_rpc::SessionConfig,
) -> greatwire_transport::Result<Session<greatwire_transport::UsbTransport>> {
    let transport = greatwire_transport::UsbTransport::open(selector)?;
    Ok(Session::with_config(transport, config))
}
