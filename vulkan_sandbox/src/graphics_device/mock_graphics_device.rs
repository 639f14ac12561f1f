/// Mock graphics device for unit testing (no GPU required)
///
/// Tracks every object it hands out and models the parts of the Vulkan
/// execution model the frame loop relies on:
/// - fences move Signaled -> Unsignaled (reset) -> Pending (submit) -> Signaled (wait)
/// - a command buffer is Pending from submission until its fence is waited on
/// - semaphores are signaled by acquire/submit and consumed by submit/present
///
/// Misuse that would be undefined behavior on a real driver (resetting a
/// pending fence, re-recording a pending command buffer, waiting on a fence
/// nothing will ever signal) fails with `Error::InvalidResource`. Invalid
/// destroys are counted in `misuse_count()`.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::error::{Error, Result};
use crate::graphics_device::*;

new_key_type! {
    struct MockKey;
}

fn to_raw(key: MockKey) -> u64 {
    key.data().as_ffi()
}

fn to_key(raw: u64) -> MockKey {
    MockKey::from(KeyData::from_ffi(raw))
}

// ============================================================================
// Object kinds and events
// ============================================================================

/// Kind of driver object, used for live/created/destroyed accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Fence,
    Semaphore,
    CommandBuffer,
    Swapchain,
    ImageView,
    RenderPass,
    Framebuffer,
    DescriptorSetLayout,
    Pipeline,
    DescriptorPool,
    Buffer,
}

/// Driver call observed by the mock, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    Created(ObjectKind, u64),
    Destroyed(ObjectKind, u64),
    WaitForFence(FenceHandle),
    ResetFence(FenceHandle),
    Acquire { semaphore: SemaphoreHandle },
    BeginCommandBuffer(CommandBufferHandle),
    Submit { command_buffer: CommandBufferHandle, fence: Option<FenceHandle> },
    Present { image_index: u32 },
    WaitIdle,
}

/// Command recorded into a mock command buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass { framebuffer: FramebufferHandle, extent: Extent2D, clear_value: ClearValue },
    EndRenderPass,
    BindPipeline(PipelineHandle),
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindVertexBuffer(BufferHandle),
    BindIndexBuffer(BufferHandle, IndexType),
    BindDescriptorSet(DescriptorSetHandle),
    DrawIndexed { index_count: u32 },
    CopyBuffer { src: BufferHandle, dst: BufferHandle, size: u64 },
}

/// Scripted result of the next `acquire_next_image`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedAcquire {
    Image,
    Suboptimal,
    OutOfDate,
    Fail,
}

/// Scripted result of the next `present`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedPresent {
    Presented,
    Suboptimal,
    OutOfDate,
    Fail,
}

// ============================================================================
// Tracked objects
// ============================================================================

/// Mock fence state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceState {
    Signaled,
    Unsignaled,
    /// Submitted, GPU work not yet observed complete
    Pending,
}

#[derive(Debug)]
struct MockFence {
    state: FenceState,
    resets: u32,
    completions: u32,
}

/// Mock command buffer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    Initial,
    Recording,
    Executable,
    Pending,
}

#[derive(Debug)]
struct MockCommandBuffer {
    state: CommandBufferState,
    in_render_pass: bool,
    commands: Vec<RecordedCommand>,
    pending_fence: Option<FenceHandle>,
    submissions: u32,
}

#[derive(Debug)]
struct MockSwapchain {
    config: SwapchainConfig,
    images: Vec<ImageHandle>,
    next_image: u32,
}

#[derive(Debug)]
struct MockBuffer {
    desc: BufferDesc,
    data: Vec<u8>,
}

#[derive(Debug)]
struct MockDescriptorPool {
    max_sets: u32,
    allocated: u32,
}

// ============================================================================
// MockGraphicsDevice
// ============================================================================

/// Mock graphics device
pub struct MockGraphicsDevice {
    support: SwapchainSupportInfo,
    queue_families: Vec<u32>,

    fences: SlotMap<MockKey, MockFence>,
    semaphores: SlotMap<MockKey, bool>,
    command_buffers: SlotMap<MockKey, MockCommandBuffer>,
    swapchains: SlotMap<MockKey, MockSwapchain>,
    image_views: SlotMap<MockKey, ImageHandle>,
    render_passes: SlotMap<MockKey, RenderPassDesc>,
    framebuffers: SlotMap<MockKey, ImageViewHandle>,
    descriptor_set_layouts: SlotMap<MockKey, Vec<DescriptorBinding>>,
    pipelines: SlotMap<MockKey, RenderPassHandle>,
    descriptor_pools: SlotMap<MockKey, MockDescriptorPool>,
    buffers: SlotMap<MockKey, MockBuffer>,

    next_image_id: u64,
    next_descriptor_set_id: u64,

    acquire_script: VecDeque<ScriptedAcquire>,
    present_script: VecDeque<ScriptedPresent>,
    fail_buffer_creation_in: Option<u32>,

    created: FxHashMap<ObjectKind, u32>,
    destroyed: FxHashMap<ObjectKind, u32>,
    events: Vec<MockEvent>,
    misuse: u32,
}

impl MockGraphicsDevice {
    /// Mock with a 800x600 surface (2..=4 images, B8G8R8A8_SRGB, FIFO) and a
    /// single queue family doing graphics and presentation
    pub fn new() -> Self {
        Self::with_support(Self::default_support())
    }

    /// Mock reporting the given surface support
    pub fn with_support(support: SwapchainSupportInfo) -> Self {
        Self {
            support,
            queue_families: vec![0, 0],
            fences: SlotMap::with_key(),
            semaphores: SlotMap::with_key(),
            command_buffers: SlotMap::with_key(),
            swapchains: SlotMap::with_key(),
            image_views: SlotMap::with_key(),
            render_passes: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            descriptor_set_layouts: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            descriptor_pools: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            next_image_id: 1,
            next_descriptor_set_id: 1,
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            fail_buffer_creation_in: None,
            created: FxHashMap::default(),
            destroyed: FxHashMap::default(),
            events: Vec::new(),
            misuse: 0,
        }
    }

    /// Surface support used by `new()`
    pub fn default_support() -> SwapchainSupportInfo {
        SwapchainSupportInfo {
            capabilities: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 4,
                current_extent: Extent2D::new(800, 600),
                min_image_extent: Extent2D::new(1, 1),
                max_image_extent: Extent2D::new(4096, 4096),
                current_transform: SurfaceTransform::IDENTITY,
            },
            formats: vec![SurfaceFormat::new(Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonLinear)],
            present_modes: vec![PresentMode::Fifo],
        }
    }

    // ===== SCRIPTING =====

    /// Replace the surface support returned by later queries
    pub fn set_swapchain_support(&mut self, support: SwapchainSupportInfo) {
        self.support = support;
    }

    /// Replace the reported graphics/present queue families
    pub fn set_queue_family_indices(&mut self, families: Vec<u32>) {
        self.queue_families = families;
    }

    /// Queue the outcome of an upcoming acquire (default: `Image`)
    pub fn push_acquire(&mut self, outcome: ScriptedAcquire) {
        self.acquire_script.push_back(outcome);
    }

    /// Queue the outcome of an upcoming present (default: `Presented`)
    pub fn push_present(&mut self, outcome: ScriptedPresent) {
        self.present_script.push_back(outcome);
    }

    /// Make the n-th next `create_buffer` call fail (1 = the next one)
    pub fn fail_buffer_creation_in(&mut self, n: u32) {
        self.fail_buffer_creation_in = Some(n);
    }

    // ===== INSPECTION =====

    pub fn events(&self) -> &[MockEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Number of live objects of a kind
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Fence => self.fences.len(),
            ObjectKind::Semaphore => self.semaphores.len(),
            ObjectKind::CommandBuffer => self.command_buffers.len(),
            ObjectKind::Swapchain => self.swapchains.len(),
            ObjectKind::ImageView => self.image_views.len(),
            ObjectKind::RenderPass => self.render_passes.len(),
            ObjectKind::Framebuffer => self.framebuffers.len(),
            ObjectKind::DescriptorSetLayout => self.descriptor_set_layouts.len(),
            ObjectKind::Pipeline => self.pipelines.len(),
            ObjectKind::DescriptorPool => self.descriptor_pools.len(),
            ObjectKind::Buffer => self.buffers.len(),
        }
    }

    /// Number of live objects of every kind
    pub fn total_live_objects(&self) -> usize {
        ALL_KINDS.iter().map(|kind| self.live_count(*kind)).sum()
    }

    pub fn created_count(&self, kind: ObjectKind) -> u32 {
        self.created.get(&kind).copied().unwrap_or(0)
    }

    pub fn destroyed_count(&self, kind: ObjectKind) -> u32 {
        self.destroyed.get(&kind).copied().unwrap_or(0)
    }

    /// Invalid destroys (unknown handle, object still in use)
    pub fn misuse_count(&self) -> u32 {
        self.misuse
    }

    pub fn fence_state(&self, fence: FenceHandle) -> Option<FenceState> {
        self.fences.get(to_key(fence.as_raw())).map(|f| f.state)
    }

    /// Signaled -> Unsignaled transitions of a fence
    pub fn fence_reset_count(&self, fence: FenceHandle) -> u32 {
        self.fences.get(to_key(fence.as_raw())).map_or(0, |f| f.resets)
    }

    /// Pending -> Signaled transitions of a fence
    pub fn fence_completion_count(&self, fence: FenceHandle) -> u32 {
        self.fences.get(to_key(fence.as_raw())).map_or(0, |f| f.completions)
    }

    pub fn semaphore_signaled(&self, semaphore: SemaphoreHandle) -> Option<bool> {
        self.semaphores.get(to_key(semaphore.as_raw())).copied()
    }

    pub fn command_buffer_state(&self, command_buffer: CommandBufferHandle) -> Option<CommandBufferState> {
        self.command_buffers.get(to_key(command_buffer.as_raw())).map(|c| c.state)
    }

    /// Commands of the last recording of a command buffer
    pub fn recorded_commands(&self, command_buffer: CommandBufferHandle) -> &[RecordedCommand] {
        self.command_buffers
            .get(to_key(command_buffer.as_raw()))
            .map(|c| c.commands.as_slice())
            .unwrap_or(&[])
    }

    pub fn submission_count(&self, command_buffer: CommandBufferHandle) -> u32 {
        self.command_buffers.get(to_key(command_buffer.as_raw())).map_or(0, |c| c.submissions)
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(to_key(buffer.as_raw())).map(|b| b.data.as_slice())
    }

    pub fn buffer_desc(&self, buffer: BufferHandle) -> Option<BufferDesc> {
        self.buffers.get(to_key(buffer.as_raw())).map(|b| b.desc)
    }

    pub fn swapchain_config(&self, swapchain: SwapchainHandle) -> Option<&SwapchainConfig> {
        self.swapchains.get(to_key(swapchain.as_raw())).map(|s| &s.config)
    }

    // ===== INTERNALS =====

    fn on_create(&mut self, kind: ObjectKind, raw: u64) {
        *self.created.entry(kind).or_insert(0) += 1;
        self.events.push(MockEvent::Created(kind, raw));
    }

    fn on_destroy(&mut self, kind: ObjectKind, raw: u64, existed: bool) {
        if existed {
            *self.destroyed.entry(kind).or_insert(0) += 1;
            self.events.push(MockEvent::Destroyed(kind, raw));
        } else {
            self.misuse += 1;
        }
    }

    fn command_buffer_mut(&mut self, command_buffer: CommandBufferHandle) -> Result<&mut MockCommandBuffer> {
        self.command_buffers
            .get_mut(to_key(command_buffer.as_raw()))
            .ok_or_else(|| Error::InvalidResource(format!("Unknown command buffer {:?}", command_buffer)))
    }

    fn record(&mut self, command_buffer: CommandBufferHandle, command: RecordedCommand) -> Result<()> {
        let cmd = self.command_buffer_mut(command_buffer)?;
        if cmd.state != CommandBufferState::Recording {
            return Err(Error::InvalidResource(format!(
                "Command buffer {:?} is not recording ({:?})",
                command_buffer, cmd.state
            )));
        }

        match command {
            RecordedCommand::BeginRenderPass { .. } if cmd.in_render_pass => {
                return Err(Error::InvalidResource("Render pass already begun".to_string()));
            }
            RecordedCommand::BeginRenderPass { .. } => cmd.in_render_pass = true,
            RecordedCommand::EndRenderPass if !cmd.in_render_pass => {
                return Err(Error::InvalidResource("No render pass to end".to_string()));
            }
            RecordedCommand::EndRenderPass => cmd.in_render_pass = false,
            RecordedCommand::DrawIndexed { .. } if !cmd.in_render_pass => {
                return Err(Error::InvalidResource("Draw outside of a render pass".to_string()));
            }
            RecordedCommand::CopyBuffer { .. } if cmd.in_render_pass => {
                return Err(Error::InvalidResource("Copy inside a render pass".to_string()));
            }
            _ => {}
        }

        cmd.commands.push(command);
        Ok(())
    }

    fn require_buffer(&self, buffer: BufferHandle) -> Result<&MockBuffer> {
        self.buffers
            .get(to_key(buffer.as_raw()))
            .ok_or_else(|| Error::InvalidResource(format!("Unknown buffer {:?}", buffer)))
    }

    /// Execute the transfer commands of a submitted command buffer
    fn execute_copies(&mut self, commands: &[RecordedCommand]) -> Result<()> {
        for command in commands {
            if let RecordedCommand::CopyBuffer { src, dst, size } = *command {
                let src_buffer = self.require_buffer(src)?;
                if !src_buffer.desc.usage.contains(BufferUsage::TRANSFER_SRC) {
                    return Err(Error::InvalidResource("Copy source lacks TRANSFER_SRC".to_string()));
                }
                if size > src_buffer.desc.size {
                    return Err(Error::InvalidResource("Copy reads past the source".to_string()));
                }
                let bytes = src_buffer.data[..size as usize].to_vec();

                let dst_buffer = self
                    .buffers
                    .get_mut(to_key(dst.as_raw()))
                    .ok_or_else(|| Error::InvalidResource(format!("Unknown buffer {:?}", dst)))?;
                if !dst_buffer.desc.usage.contains(BufferUsage::TRANSFER_DST) {
                    return Err(Error::InvalidResource("Copy destination lacks TRANSFER_DST".to_string()));
                }
                if size > dst_buffer.desc.size {
                    return Err(Error::InvalidResource("Copy writes past the destination".to_string()));
                }
                dst_buffer.data[..size as usize].copy_from_slice(&bytes);
            }
        }
        Ok(())
    }

    /// Complete the GPU work guarded by a fence
    fn complete_fence(&mut self, fence: FenceHandle) {
        if let Some(f) = self.fences.get_mut(to_key(fence.as_raw())) {
            if f.state == FenceState::Pending {
                f.state = FenceState::Signaled;
                f.completions += 1;
            }
        }
        for (_, cmd) in self.command_buffers.iter_mut() {
            if cmd.state == CommandBufferState::Pending && cmd.pending_fence == Some(fence) {
                cmd.state = CommandBufferState::Executable;
                cmd.pending_fence = None;
            }
        }
    }
}

const ALL_KINDS: [ObjectKind; 11] = [
    ObjectKind::Fence,
    ObjectKind::Semaphore,
    ObjectKind::CommandBuffer,
    ObjectKind::Swapchain,
    ObjectKind::ImageView,
    ObjectKind::RenderPass,
    ObjectKind::Framebuffer,
    ObjectKind::DescriptorSetLayout,
    ObjectKind::Pipeline,
    ObjectKind::DescriptorPool,
    ObjectKind::Buffer,
];

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn query_swapchain_support(&self) -> Result<SwapchainSupportInfo> {
        Ok(self.support.clone())
    }

    fn queue_family_indices(&self) -> Vec<u32> {
        self.queue_families.clone()
    }

    fn create_swapchain(&mut self, config: &SwapchainConfig) -> Result<SwapchainHandle> {
        if config.extent.is_empty() {
            return Err(Error::DriverError("Swap chain extent is zero".to_string()));
        }

        let images = (0..config.image_count)
            .map(|_| {
                let image = ImageHandle::from_raw(self.next_image_id);
                self.next_image_id += 1;
                image
            })
            .collect();

        let key = self.swapchains.insert(MockSwapchain {
            config: config.clone(),
            images,
            next_image: 0,
        });
        self.on_create(ObjectKind::Swapchain, to_raw(key));
        Ok(SwapchainHandle::from_raw(to_raw(key)))
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) {
        let key = to_key(swapchain.as_raw());
        if let Some(sc) = self.swapchains.get(key) {
            // Views of its images must be gone first
            if self.image_views.values().any(|image| sc.images.contains(image)) {
                self.misuse += 1;
            }
        }
        let existed = self.swapchains.remove(key).is_some();
        self.on_destroy(ObjectKind::Swapchain, swapchain.as_raw(), existed);
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        self.swapchains
            .get(to_key(swapchain.as_raw()))
            .map(|sc| sc.images.clone())
            .ok_or_else(|| Error::InvalidResource(format!("Unknown swap chain {:?}", swapchain)))
    }

    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<AcquireOutcome> {
        self.events.push(MockEvent::Acquire { semaphore: signal });

        match self.semaphores.get(to_key(signal.as_raw())) {
            Some(false) => {}
            Some(true) => {
                return Err(Error::InvalidResource(
                    "Acquire semaphore is already signaled".to_string(),
                ))
            }
            None => return Err(Error::InvalidResource(format!("Unknown semaphore {:?}", signal))),
        }

        let suboptimal = match self.acquire_script.pop_front().unwrap_or(ScriptedAcquire::Image) {
            ScriptedAcquire::Image => false,
            ScriptedAcquire::Suboptimal => true,
            ScriptedAcquire::OutOfDate => return Ok(AcquireOutcome::OutOfDate),
            ScriptedAcquire::Fail => {
                return Err(Error::DriverError("Failed to acquire swapchain image".to_string()))
            }
        };

        let sc = self
            .swapchains
            .get_mut(to_key(swapchain.as_raw()))
            .ok_or_else(|| Error::InvalidResource(format!("Unknown swap chain {:?}", swapchain)))?;
        let image_index = sc.next_image;
        sc.next_image = (sc.next_image + 1) % sc.images.len() as u32;

        if let Some(signaled) = self.semaphores.get_mut(to_key(signal.as_raw())) {
            *signaled = true;
        }

        Ok(AcquireOutcome::Acquired { image_index, suboptimal })
    }

    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome> {
        self.events.push(MockEvent::Present { image_index });

        let image_count = self
            .swapchains
            .get(to_key(swapchain.as_raw()))
            .map(|sc| sc.images.len() as u32)
            .ok_or_else(|| Error::InvalidResource(format!("Unknown swap chain {:?}", swapchain)))?;
        if image_index >= image_count {
            return Err(Error::InvalidResource(format!("Image index {} out of range", image_index)));
        }

        match self.semaphores.get_mut(to_key(wait.as_raw())) {
            Some(signaled) if *signaled => *signaled = false,
            Some(_) => {
                return Err(Error::InvalidResource(
                    "Present waits on a semaphore nothing signals".to_string(),
                ))
            }
            None => return Err(Error::InvalidResource(format!("Unknown semaphore {:?}", wait))),
        }

        match self.present_script.pop_front().unwrap_or(ScriptedPresent::Presented) {
            ScriptedPresent::Presented => Ok(PresentOutcome::Presented),
            ScriptedPresent::Suboptimal => Ok(PresentOutcome::Suboptimal),
            ScriptedPresent::OutOfDate => Ok(PresentOutcome::OutOfDate),
            ScriptedPresent::Fail => Err(Error::DriverError("Failed to present swapchain image".to_string())),
        }
    }

    fn create_image_view(&mut self, image: ImageHandle, _format: Format) -> Result<ImageViewHandle> {
        let owned = self.swapchains.values().any(|sc| sc.images.contains(&image));
        if !owned {
            return Err(Error::InvalidResource(format!("Unknown image {:?}", image)));
        }
        let key = self.image_views.insert(image);
        self.on_create(ObjectKind::ImageView, to_raw(key));
        Ok(ImageViewHandle::from_raw(to_raw(key)))
    }

    fn destroy_image_view(&mut self, view: ImageViewHandle) {
        if self.framebuffers.values().any(|v| *v == view) {
            self.misuse += 1;
        }
        let existed = self.image_views.remove(to_key(view.as_raw())).is_some();
        self.on_destroy(ObjectKind::ImageView, view.as_raw(), existed);
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle> {
        let key = self.render_passes.insert(*desc);
        self.on_create(ObjectKind::RenderPass, to_raw(key));
        Ok(RenderPassHandle::from_raw(to_raw(key)))
    }

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle) {
        let existed = self.render_passes.remove(to_key(render_pass.as_raw())).is_some();
        self.on_destroy(ObjectKind::RenderPass, render_pass.as_raw(), existed);
    }

    fn create_framebuffer(
        &mut self,
        render_pass: RenderPassHandle,
        view: ImageViewHandle,
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        if !self.render_passes.contains_key(to_key(render_pass.as_raw())) {
            return Err(Error::InvalidResource(format!("Unknown render pass {:?}", render_pass)));
        }
        if !self.image_views.contains_key(to_key(view.as_raw())) {
            return Err(Error::InvalidResource(format!("Unknown image view {:?}", view)));
        }
        if extent.is_empty() {
            return Err(Error::DriverError("Framebuffer extent is zero".to_string()));
        }
        let key = self.framebuffers.insert(view);
        self.on_create(ObjectKind::Framebuffer, to_raw(key));
        Ok(FramebufferHandle::from_raw(to_raw(key)))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        let existed = self.framebuffers.remove(to_key(framebuffer.as_raw())).is_some();
        self.on_destroy(ObjectKind::Framebuffer, framebuffer.as_raw(), existed);
    }

    fn create_descriptor_set_layout(
        &mut self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        let key = self.descriptor_set_layouts.insert(bindings.to_vec());
        self.on_create(ObjectKind::DescriptorSetLayout, to_raw(key));
        Ok(DescriptorSetLayoutHandle::from_raw(to_raw(key)))
    }

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) {
        let existed = self.descriptor_set_layouts.remove(to_key(layout.as_raw())).is_some();
        self.on_destroy(ObjectKind::DescriptorSetLayout, layout.as_raw(), existed);
    }

    fn create_graphics_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        if desc.vertex_spirv.is_empty() || desc.fragment_spirv.is_empty() {
            return Err(Error::InvalidResource("Pipeline shader code is empty".to_string()));
        }
        if !self.render_passes.contains_key(to_key(desc.render_pass.as_raw())) {
            return Err(Error::InvalidResource(format!("Unknown render pass {:?}", desc.render_pass)));
        }
        if !self.descriptor_set_layouts.contains_key(to_key(desc.descriptor_set_layout.as_raw())) {
            return Err(Error::InvalidResource("Unknown descriptor set layout".to_string()));
        }
        let key = self.pipelines.insert(desc.render_pass);
        self.on_create(ObjectKind::Pipeline, to_raw(key));
        Ok(PipelineHandle::from_raw(to_raw(key)))
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        let existed = self.pipelines.remove(to_key(pipeline.as_raw())).is_some();
        self.on_destroy(ObjectKind::Pipeline, pipeline.as_raw(), existed);
    }

    fn create_descriptor_pool(&mut self, max_sets: u32) -> Result<DescriptorPoolHandle> {
        let key = self.descriptor_pools.insert(MockDescriptorPool { max_sets, allocated: 0 });
        self.on_create(ObjectKind::DescriptorPool, to_raw(key));
        Ok(DescriptorPoolHandle::from_raw(to_raw(key)))
    }

    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle) {
        let existed = self.descriptor_pools.remove(to_key(pool.as_raw())).is_some();
        self.on_destroy(ObjectKind::DescriptorPool, pool.as_raw(), existed);
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
        uniform_buffer: BufferHandle,
        range: u64,
    ) -> Result<DescriptorSetHandle> {
        if !self.descriptor_set_layouts.contains_key(to_key(layout.as_raw())) {
            return Err(Error::InvalidResource("Unknown descriptor set layout".to_string()));
        }
        let buffer = self.require_buffer(uniform_buffer)?;
        if !buffer.desc.usage.contains(BufferUsage::UNIFORM) || range > buffer.desc.size {
            return Err(Error::InvalidResource("Descriptor does not fit the uniform buffer".to_string()));
        }

        let pool_state = self
            .descriptor_pools
            .get_mut(to_key(pool.as_raw()))
            .ok_or_else(|| Error::InvalidResource(format!("Unknown descriptor pool {:?}", pool)))?;
        if pool_state.allocated >= pool_state.max_sets {
            return Err(Error::OutOfMemory("Descriptor pool exhausted".to_string()));
        }
        pool_state.allocated += 1;

        let set = DescriptorSetHandle::from_raw(self.next_descriptor_set_id);
        self.next_descriptor_set_id += 1;
        Ok(set)
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        if let Some(n) = self.fail_buffer_creation_in {
            if n <= 1 {
                self.fail_buffer_creation_in = None;
                return Err(Error::OutOfMemory("Scripted buffer allocation failure".to_string()));
            }
            self.fail_buffer_creation_in = Some(n - 1);
        }
        if desc.size == 0 {
            return Err(Error::InvalidResource("Buffer size is zero".to_string()));
        }

        let key = self.buffers.insert(MockBuffer {
            desc: *desc,
            data: vec![0; desc.size as usize],
        });
        self.on_create(ObjectKind::Buffer, to_raw(key));
        Ok(BufferHandle::from_raw(to_raw(key)))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        let existed = self.buffers.remove(to_key(buffer.as_raw())).is_some();
        self.on_destroy(ObjectKind::Buffer, buffer.as_raw(), existed);
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let target = self
            .buffers
            .get_mut(to_key(buffer.as_raw()))
            .ok_or_else(|| Error::InvalidResource(format!("Unknown buffer {:?}", buffer)))?;
        if !target.desc.location.is_host_visible() {
            return Err(Error::InvalidResource("Buffer is not host visible".to_string()));
        }
        let end = offset as usize + data.len();
        if end > target.data.len() {
            return Err(Error::InvalidResource("Write past the end of the buffer".to_string()));
        }
        target.data[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()> {
        let source = self.require_buffer(buffer)?;
        if !source.desc.location.is_host_visible() {
            return Err(Error::InvalidResource("Buffer is not host visible".to_string()));
        }
        let end = offset as usize + out.len();
        if end > source.data.len() {
            return Err(Error::InvalidResource("Read past the end of the buffer".to_string()));
        }
        out.copy_from_slice(&source.data[offset as usize..end]);
        Ok(())
    }

    fn allocate_command_buffer(&mut self) -> Result<CommandBufferHandle> {
        let key = self.command_buffers.insert(MockCommandBuffer {
            state: CommandBufferState::Initial,
            in_render_pass: false,
            commands: Vec::new(),
            pending_fence: None,
            submissions: 0,
        });
        self.on_create(ObjectKind::CommandBuffer, to_raw(key));
        Ok(CommandBufferHandle::from_raw(to_raw(key)))
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBufferHandle) {
        let key = to_key(command_buffer.as_raw());
        if self.command_buffers.get(key).map_or(false, |c| c.state == CommandBufferState::Pending) {
            self.misuse += 1;
        }
        let existed = self.command_buffers.remove(key).is_some();
        self.on_destroy(ObjectKind::CommandBuffer, command_buffer.as_raw(), existed);
    }

    fn begin_command_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        _usage: CommandBufferUsage,
    ) -> Result<()> {
        self.events.push(MockEvent::BeginCommandBuffer(command_buffer));

        let cmd = self.command_buffer_mut(command_buffer)?;
        match cmd.state {
            CommandBufferState::Pending => Err(Error::InvalidResource(format!(
                "Command buffer {:?} re-recorded while its submission is pending",
                command_buffer
            ))),
            CommandBufferState::Recording => Err(Error::InvalidResource(format!(
                "Command buffer {:?} is already recording",
                command_buffer
            ))),
            _ => {
                cmd.state = CommandBufferState::Recording;
                cmd.in_render_pass = false;
                cmd.commands.clear();
                Ok(())
            }
        }
    }

    fn end_command_buffer(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let cmd = self.command_buffer_mut(command_buffer)?;
        if cmd.state != CommandBufferState::Recording || cmd.in_render_pass {
            return Err(Error::InvalidResource(format!(
                "Command buffer {:?} cannot end recording",
                command_buffer
            )));
        }
        cmd.state = CommandBufferState::Executable;
        Ok(())
    }

    fn cmd_begin_render_pass(
        &mut self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear_value: ClearValue,
    ) -> Result<()> {
        if !self.render_passes.contains_key(to_key(render_pass.as_raw())) {
            return Err(Error::InvalidResource(format!("Unknown render pass {:?}", render_pass)));
        }
        if !self.framebuffers.contains_key(to_key(framebuffer.as_raw())) {
            return Err(Error::InvalidResource(format!("Unknown framebuffer {:?}", framebuffer)));
        }
        self.record(
            command_buffer,
            RecordedCommand::BeginRenderPass { framebuffer, extent, clear_value },
        )
    }

    fn cmd_end_render_pass(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        self.record(command_buffer, RecordedCommand::EndRenderPass)
    }

    fn cmd_bind_pipeline(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
    ) -> Result<()> {
        if !self.pipelines.contains_key(to_key(pipeline.as_raw())) {
            return Err(Error::InvalidResource(format!("Unknown pipeline {:?}", pipeline)));
        }
        self.record(command_buffer, RecordedCommand::BindPipeline(pipeline))
    }

    fn cmd_set_viewport(&mut self, command_buffer: CommandBufferHandle, viewport: Viewport) -> Result<()> {
        self.record(command_buffer, RecordedCommand::SetViewport(viewport))
    }

    fn cmd_set_scissor(&mut self, command_buffer: CommandBufferHandle, scissor: Rect2D) -> Result<()> {
        self.record(command_buffer, RecordedCommand::SetScissor(scissor))
    }

    fn cmd_bind_vertex_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        _offset: u64,
    ) -> Result<()> {
        self.require_buffer(buffer)?;
        self.record(command_buffer, RecordedCommand::BindVertexBuffer(buffer))
    }

    fn cmd_bind_index_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        _offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        self.require_buffer(buffer)?;
        self.record(command_buffer, RecordedCommand::BindIndexBuffer(buffer, index_type))
    }

    fn cmd_bind_descriptor_set(
        &mut self,
        command_buffer: CommandBufferHandle,
        _pipeline: PipelineHandle,
        descriptor_set: DescriptorSetHandle,
    ) -> Result<()> {
        self.record(command_buffer, RecordedCommand::BindDescriptorSet(descriptor_set))
    }

    fn cmd_draw_indexed(
        &mut self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
    ) -> Result<()> {
        self.record(command_buffer, RecordedCommand::DrawIndexed { index_count })
    }

    fn cmd_copy_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        src: BufferHandle,
        dst: BufferHandle,
        size: u64,
    ) -> Result<()> {
        self.require_buffer(src)?;
        self.require_buffer(dst)?;
        self.record(command_buffer, RecordedCommand::CopyBuffer { src, dst, size })
    }

    fn submit(&mut self, desc: &SubmitDesc) -> Result<()> {
        self.events.push(MockEvent::Submit {
            command_buffer: desc.command_buffer,
            fence: desc.fence,
        });

        let state = self.command_buffer_mut(desc.command_buffer)?.state;
        if state != CommandBufferState::Executable {
            return Err(Error::InvalidResource(format!(
                "Submitted command buffer is {:?}",
                state
            )));
        }

        if let Some(fence) = desc.fence {
            match self.fence_state(fence) {
                Some(FenceState::Unsignaled) => {}
                Some(other) => {
                    return Err(Error::InvalidResource(format!(
                        "Submission fence must be unsignaled, is {:?}",
                        other
                    )))
                }
                None => return Err(Error::InvalidResource(format!("Unknown fence {:?}", fence))),
            }
        }

        if let Some((semaphore, _stage)) = desc.wait {
            match self.semaphores.get_mut(to_key(semaphore.as_raw())) {
                Some(signaled) if *signaled => *signaled = false,
                Some(_) => {
                    return Err(Error::InvalidResource(
                        "Submission waits on a semaphore nothing signals".to_string(),
                    ))
                }
                None => return Err(Error::InvalidResource(format!("Unknown semaphore {:?}", semaphore))),
            }
        }

        let commands = self.command_buffer_mut(desc.command_buffer)?.commands.clone();
        self.execute_copies(&commands)?;

        if let Some(semaphore) = desc.signal {
            let signaled = self
                .semaphores
                .get_mut(to_key(semaphore.as_raw()))
                .ok_or_else(|| Error::InvalidResource(format!("Unknown semaphore {:?}", semaphore)))?;
            *signaled = true;
        }

        if let Some(fence) = desc.fence {
            if let Some(f) = self.fences.get_mut(to_key(fence.as_raw())) {
                f.state = FenceState::Pending;
            }
        }

        let cmd = self.command_buffer_mut(desc.command_buffer)?;
        cmd.state = CommandBufferState::Pending;
        cmd.pending_fence = desc.fence;
        cmd.submissions += 1;
        Ok(())
    }

    fn create_fence(&mut self, signaled: bool) -> Result<FenceHandle> {
        let state = if signaled { FenceState::Signaled } else { FenceState::Unsignaled };
        let key = self.fences.insert(MockFence { state, resets: 0, completions: 0 });
        self.on_create(ObjectKind::Fence, to_raw(key));
        Ok(FenceHandle::from_raw(to_raw(key)))
    }

    fn destroy_fence(&mut self, fence: FenceHandle) {
        let key = to_key(fence.as_raw());
        if self.fences.get(key).map_or(false, |f| f.state == FenceState::Pending) {
            self.misuse += 1;
        }
        let existed = self.fences.remove(key).is_some();
        self.on_destroy(ObjectKind::Fence, fence.as_raw(), existed);
    }

    fn wait_for_fence(&mut self, fence: FenceHandle) -> Result<()> {
        self.events.push(MockEvent::WaitForFence(fence));

        match self.fence_state(fence) {
            Some(FenceState::Signaled) => Ok(()),
            Some(FenceState::Pending) => {
                self.complete_fence(fence);
                Ok(())
            }
            Some(FenceState::Unsignaled) => Err(Error::InvalidResource(format!(
                "Waiting on fence {:?} that no submission will signal",
                fence
            ))),
            None => Err(Error::InvalidResource(format!("Unknown fence {:?}", fence))),
        }
    }

    fn reset_fence(&mut self, fence: FenceHandle) -> Result<()> {
        self.events.push(MockEvent::ResetFence(fence));

        let f = self
            .fences
            .get_mut(to_key(fence.as_raw()))
            .ok_or_else(|| Error::InvalidResource(format!("Unknown fence {:?}", fence)))?;
        match f.state {
            FenceState::Pending => Err(Error::InvalidResource(format!(
                "Fence {:?} reset while its submission is pending",
                fence
            ))),
            FenceState::Signaled => {
                f.state = FenceState::Unsignaled;
                f.resets += 1;
                Ok(())
            }
            FenceState::Unsignaled => Ok(()),
        }
    }

    fn create_semaphore(&mut self) -> Result<SemaphoreHandle> {
        let key = self.semaphores.insert(false);
        self.on_create(ObjectKind::Semaphore, to_raw(key));
        Ok(SemaphoreHandle::from_raw(to_raw(key)))
    }

    fn destroy_semaphore(&mut self, semaphore: SemaphoreHandle) {
        let existed = self.semaphores.remove(to_key(semaphore.as_raw())).is_some();
        self.on_destroy(ObjectKind::Semaphore, semaphore.as_raw(), existed);
    }

    fn wait_idle(&mut self) -> Result<()> {
        self.events.push(MockEvent::WaitIdle);

        let pending: Vec<FenceHandle> = self
            .fences
            .iter()
            .filter(|(_, f)| f.state == FenceState::Pending)
            .map(|(key, _)| FenceHandle::from_raw(to_raw(key)))
            .collect();
        for fence in pending {
            self.complete_fence(fence);
        }

        // Fence-less submissions complete too
        for (_, cmd) in self.command_buffers.iter_mut() {
            if cmd.state == CommandBufferState::Pending {
                cmd.state = CommandBufferState::Executable;
                cmd.pending_fence = None;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
