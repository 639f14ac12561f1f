//! Error types for the Vulkan sandbox
//!
//! Every failure that is not a transient presentation staleness ends up as one
//! of these variants and is propagated to the application entry point, which
//! logs it and exits with a non-zero status.

use std::fmt;

/// Result type for sandbox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Sandbox errors
#[derive(Debug, Clone)]
pub enum Error {
    /// No compatible surface format, present mode, queue family or device
    UnsupportedConfiguration(String),

    /// A GPU API call failed (creation, submission, unexpected acquire/present code)
    DriverError(String),

    /// No suitable memory type or the allocator ran out of memory
    OutOfMemory(String),

    /// Bring-up failed (window, Vulkan loader, instance, validation layers)
    InitializationFailed(String),

    /// Invalid input or misuse of a resource (bad shader blob, unknown handle, ...)
    InvalidResource(String),
}

impl Error {
    /// True for errors caused by the platform not offering what the application needs
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::UnsupportedConfiguration(_))
    }

    /// True for failed driver calls, including resource exhaustion
    pub fn is_driver_error(&self) -> bool {
        matches!(self, Error::DriverError(_) | Error::OutOfMemory(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedConfiguration(msg) => write!(f, "Unsupported configuration: {}", msg),
            Error::DriverError(msg) => write!(f, "Driver error: {}", msg),
            Error::OutOfMemory(msg) => write!(f, "Out of GPU memory: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
