/// Frame module - per-frame contexts and the frame loop state machine

pub mod frame_context;
pub mod frame_renderer;

pub use frame_context::*;
pub use frame_renderer::*;
