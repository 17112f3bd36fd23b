//! Command sessions, RPC bindings and API discovery for libgreat devices.
//!
//! A [`Session`] frames commands onto a [`Transport`](greatwire_transport::Transport),
//! reads their responses, and turns device-signaled failures into
//! [`RpcError::CommandFailed`] carrying the device's error number. On top of
//! that, [`RpcBinding`]s give verbs a name and typed signature, [`CoreApi`]
//! wraps the core introspection class, and [`discover`] builds an
//! [`ApiCollection`] of every class a device exposes.

pub mod binding;
pub mod config;
pub mod core_api;
pub mod discovery;
pub mod errno;
pub mod error;
pub mod session;

pub use binding::{parse_param_names, RpcBinding};
pub use config::{
    CallOptions, DiscoveryConfig, SessionConfig, DEFAULT_CANCEL_RETRY_DELAY, DEFAULT_TIMEOUT,
};
pub use core_api::{
    core_bindings, CoreApi, CoreVerb, DescriptorKind, CORE_CLASS_NAME, CORE_CLASS_NUMBER,
    CORE_VERBS,
};
pub use discovery::{
    describe_verb, discover, ApiCollection, ClassDescriptor, VerbDescriptor, UNDESCRIBED,
    UNDOCUMENTED,
};
pub use errno::{errno_code, errno_name};
pub use error::{Result, RpcError};
pub use session::Session;
