/// Opaque driver object handles
///
/// Every object created through a `GraphicsDevice` is identified by a plain
/// 64-bit value. Handles are `Copy` and carry no ownership: whoever created the
/// object is responsible for destroying it through the same device.

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(u64);

            impl $name {
                /// Null handle
                pub const NULL: Self = Self(0);

                /// Wrap a raw driver value
                pub const fn from_raw(raw: u64) -> Self {
                    Self(raw)
                }

                /// Raw driver value
                pub const fn as_raw(self) -> u64 {
                    self.0
                }

                pub const fn is_null(self) -> bool {
                    self.0 == 0
                }
            }
        )*
    };
}

define_handle!(
    /// CPU/GPU synchronization primitive
    FenceHandle,
    /// GPU/GPU synchronization primitive
    SemaphoreHandle,
    /// Primary command buffer
    CommandBufferHandle,
    /// Swap chain
    SwapchainHandle,
    /// Image (swap chain images are owned by their swap chain)
    ImageHandle,
    ImageViewHandle,
    RenderPassHandle,
    FramebufferHandle,
    /// Buffer together with its bound memory
    BufferHandle,
    /// Graphics pipeline together with its layout
    PipelineHandle,
    DescriptorSetLayoutHandle,
    DescriptorPoolHandle,
    /// Descriptor set (freed with its pool)
    DescriptorSetHandle,
);
