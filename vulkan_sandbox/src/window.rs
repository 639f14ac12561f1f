/// Windowing collaborator consumed by the frame loop

/// Window the frame loop renders into
///
/// Implemented over a real windowing library by the application and by a
/// scripted fake in tests. Resize tracking is latched: `has_resized` stays
/// true until `reset_resized` is called after the swap chain was rebuilt.
pub trait WindowSurface {
    /// The user asked to close the window
    fn should_close(&self) -> bool;

    /// Current frame-buffer size in pixels, (0, 0) while minimized
    fn frame_buffer_size(&self) -> (u32, u32);

    /// A resize happened since the last `reset_resized`
    fn has_resized(&self) -> bool;

    /// Acknowledge the latched resize
    fn reset_resized(&mut self);

    /// Block until at least one window event arrived and process it
    fn wait_events(&mut self);
}
