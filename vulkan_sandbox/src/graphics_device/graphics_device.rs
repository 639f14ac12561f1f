/// GraphicsDevice trait - the driver boundary
///
/// Vulkan-1.0-shaped entry points over opaque handles. The frame loop, the
/// swap chain targets, the upload path and the scene only ever talk to the GPU
/// through this trait, which lets them run against a mock device in tests.

use crate::error::Result;
use crate::graphics_device::{
    AcquireOutcome, BufferDesc, BufferHandle, ClearValue, CommandBufferHandle,
    CommandBufferUsage, DescriptorBinding, DescriptorPoolHandle, DescriptorSetHandle,
    DescriptorSetLayoutHandle, Extent2D, FenceHandle, Format, FramebufferHandle,
    ImageHandle, ImageViewHandle, IndexType, PipelineDesc, PipelineHandle,
    PresentOutcome, Rect2D, RenderPassDesc, RenderPassHandle, SemaphoreHandle,
    SubmitDesc, SwapchainConfig, SwapchainHandle, SwapchainSupportInfo, Viewport,
};

/// Driver boundary trait
///
/// Object lifetimes are explicit: every `create_*`/`allocate_*` must be paired
/// with the matching `destroy_*`/`free_*` on the same device, children before
/// parents. Waits on fences use an infinite timeout.
pub trait GraphicsDevice {
    // ===== SURFACE / QUEUES =====

    /// Query the surface capabilities, formats and present modes
    ///
    /// Must be called again before every swap chain (re)creation.
    fn query_swapchain_support(&self) -> Result<SwapchainSupportInfo>;

    /// Queue families used for rendering and presentation
    ///
    /// May contain duplicates when one family does both.
    fn queue_family_indices(&self) -> Vec<u32>;

    // ===== SWAP CHAIN =====

    /// Create a swap chain from a negotiated configuration
    fn create_swapchain(&mut self, config: &SwapchainConfig) -> Result<SwapchainHandle>;

    /// Destroy a swap chain (its images go with it)
    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle);

    /// Images owned by the swap chain, in presentation index order
    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>>;

    /// Acquire the next presentable image
    ///
    /// # Arguments
    ///
    /// * `swapchain` - Swap chain to acquire from
    /// * `signal` - Semaphore signaled once the image is ready to be rendered to
    ///
    /// # Returns
    ///
    /// `AcquireOutcome::OutOfDate` when the swap chain must be recreated, an error
    /// for any other failure
    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<AcquireOutcome>;

    /// Queue an image for presentation on the present queue
    ///
    /// # Arguments
    ///
    /// * `swapchain` - Swap chain owning the image
    /// * `image_index` - Index returned by `acquire_next_image`
    /// * `wait` - Semaphore to wait on before presenting
    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome>;

    // ===== RENDER TARGETS =====

    /// Create a 2D color view of an image
    fn create_image_view(&mut self, image: ImageHandle, format: Format) -> Result<ImageViewHandle>;

    fn destroy_image_view(&mut self, view: ImageViewHandle);

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle>;

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle);

    /// Create a framebuffer with a single color attachment
    fn create_framebuffer(
        &mut self,
        render_pass: RenderPassHandle,
        view: ImageViewHandle,
        extent: Extent2D,
    ) -> Result<FramebufferHandle>;

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    // ===== PIPELINE / DESCRIPTORS =====

    /// Create a descriptor set layout of uniform buffer bindings
    fn create_descriptor_set_layout(
        &mut self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle>;

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle);

    /// Create a graphics pipeline (and its layout)
    fn create_graphics_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle>;

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle);

    /// Create a pool for `max_sets` single-uniform-buffer descriptor sets
    fn create_descriptor_pool(&mut self, max_sets: u32) -> Result<DescriptorPoolHandle>;

    /// Destroy a pool and every set allocated from it
    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle);

    /// Allocate a descriptor set and point binding 0 at a uniform buffer
    ///
    /// # Arguments
    ///
    /// * `pool` - Pool to allocate from
    /// * `layout` - Layout of the set
    /// * `uniform_buffer` - Buffer bound at binding 0
    /// * `range` - Size in bytes of the bound range
    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
        uniform_buffer: BufferHandle,
        range: u64,
    ) -> Result<DescriptorSetHandle>;

    // ===== BUFFERS =====

    /// Create a buffer and bind memory to it
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle>;

    /// Destroy a buffer and release its memory
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Copy bytes into a host-visible buffer (map, copy, unmap)
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Copy bytes out of a host-visible buffer
    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()>;

    // ===== COMMAND BUFFERS =====

    /// Allocate a primary command buffer from the graphics command pool
    fn allocate_command_buffer(&mut self) -> Result<CommandBufferHandle>;

    fn free_command_buffer(&mut self, command_buffer: CommandBufferHandle);

    /// Reset a command buffer and start recording into it
    ///
    /// The caller must guarantee that the GPU has finished any previous
    /// submission of this command buffer.
    fn begin_command_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        usage: CommandBufferUsage,
    ) -> Result<()>;

    fn end_command_buffer(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    /// Begin a render pass, clearing the single color attachment
    fn cmd_begin_render_pass(
        &mut self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear_value: ClearValue,
    ) -> Result<()>;

    fn cmd_end_render_pass(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn cmd_bind_pipeline(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
    ) -> Result<()>;

    fn cmd_set_viewport(&mut self, command_buffer: CommandBufferHandle, viewport: Viewport) -> Result<()>;

    fn cmd_set_scissor(&mut self, command_buffer: CommandBufferHandle, scissor: Rect2D) -> Result<()>;

    fn cmd_bind_vertex_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
    ) -> Result<()>;

    fn cmd_bind_index_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()>;

    /// Bind a descriptor set at set 0 of the pipeline's layout
    fn cmd_bind_descriptor_set(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        descriptor_set: DescriptorSetHandle,
    ) -> Result<()>;

    fn cmd_draw_indexed(
        &mut self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        first_index: u32,
        vertex_offset: i32,
    ) -> Result<()>;

    /// Record a copy of `size` bytes from the start of `src` to the start of `dst`
    fn cmd_copy_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        src: BufferHandle,
        dst: BufferHandle,
        size: u64,
    ) -> Result<()>;

    /// Submit a recorded command buffer to the graphics queue
    fn submit(&mut self, desc: &SubmitDesc) -> Result<()>;

    // ===== SYNCHRONIZATION =====

    /// Create a fence, optionally in the signaled state
    fn create_fence(&mut self, signaled: bool) -> Result<FenceHandle>;

    fn destroy_fence(&mut self, fence: FenceHandle);

    /// Block until the fence is signaled (no timeout)
    fn wait_for_fence(&mut self, fence: FenceHandle) -> Result<()>;

    /// Return a fence to the unsignaled state
    fn reset_fence(&mut self, fence: FenceHandle) -> Result<()>;

    fn create_semaphore(&mut self) -> Result<SemaphoreHandle>;

    fn destroy_semaphore(&mut self, semaphore: SemaphoreHandle);

    /// Block until the device has finished all submitted work
    fn wait_idle(&mut self) -> Result<()>;
}
