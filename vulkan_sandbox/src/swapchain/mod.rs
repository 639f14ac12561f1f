/// Swap chain module - configuration negotiation and per-generation render targets

pub mod negotiator;
pub mod swapchain_targets;

pub use negotiator::*;
pub use swapchain_targets::*;
