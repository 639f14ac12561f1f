/// Mapping of failed Vulkan and allocator calls to sandbox errors

use ash::vk;
use gpu_allocator::AllocationError;
use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::Error;
use vulkan_sandbox::{sandbox_err, sandbox_error};

/// Log a failed call and turn its result code into an error
///
/// Out-of-memory codes become `Error::OutOfMemory`, everything else
/// `Error::DriverError`.
pub(crate) fn vk_error(log: &Log, what: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY
        | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
        | vk::Result::ERROR_OUT_OF_POOL_MEMORY => {
            sandbox_error!(log, "{}: {:?}", what, result);
            Error::OutOfMemory(format!("{}: {:?}", what, result))
        }
        _ => sandbox_err!(log, "{}: {:?}", what, result),
    }
}

/// Same as [`vk_error`] for bring-up calls
pub(crate) fn init_error(log: &Log, what: &str, result: vk::Result) -> Error {
    sandbox_error!(log, "{}: {:?}", what, result);
    Error::InitializationFailed(format!("{}: {:?}", what, result))
}

/// Log a failed allocation
pub(crate) fn allocation_error(log: &Log, what: &str, error: AllocationError) -> Error {
    match error {
        AllocationError::OutOfMemory => {
            sandbox_error!(log, "{}: out of memory", what);
            Error::OutOfMemory(format!("{}: out of memory", what))
        }
        AllocationError::NoCompatibleMemoryTypeFound => {
            sandbox_error!(log, "{}: no compatible memory type", what);
            Error::OutOfMemory(format!("{}: no compatible memory type", what))
        }
        other => sandbox_err!(log, "{}: {}", what, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_codes() {
        let log = Log::disabled();

        assert!(matches!(
            vk_error(&log, "vkAllocateMemory", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
            Error::OutOfMemory(_)
        ));
        assert!(matches!(
            vk_error(&log, "vkAllocateDescriptorSets", vk::Result::ERROR_OUT_OF_POOL_MEMORY),
            Error::OutOfMemory(_)
        ));
    }

    #[test]
    fn test_other_codes_are_driver_errors() {
        let log = Log::disabled();

        match vk_error(&log, "vkQueueSubmit", vk::Result::ERROR_DEVICE_LOST) {
            Error::DriverError(message) => {
                assert!(message.starts_with("vkQueueSubmit"));
                assert!(message.contains("ERROR_DEVICE_LOST"));
            }
            other => panic!("Expected DriverError, got {:?}", other),
        }
    }

    #[test]
    fn test_init_error() {
        let err = init_error(&Log::disabled(), "vkCreateInstance", vk::Result::ERROR_LAYER_NOT_PRESENT);

        assert!(matches!(err, Error::InitializationFailed(_)));
    }

    #[test]
    fn test_allocation_errors() {
        let log = Log::disabled();

        assert!(matches!(
            allocation_error(&log, "buffer", AllocationError::OutOfMemory),
            Error::OutOfMemory(_)
        ));
        assert!(matches!(
            allocation_error(&log, "buffer", AllocationError::InvalidAllocatorCreateDesc("x".to_string())),
            Error::DriverError(_)
        ));
    }
}
