//! Graft error types

use crate::native::NativeHandle;
use dom3d_ir::Property;
use thiserror::Error;

/// A native renderer object refused a write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("No native object with handle {0}")]
    UnknownHandle(NativeHandle),

    #[error("Native object {handle} has no property {property}")]
    Unsupported {
        handle: NativeHandle,
        property: Property,
    },

    #[error("Native object {0} rejected the write")]
    Rejected(NativeHandle),
}

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
