//! Frame loop and presentation state machine
//!
//! Each call to [`FrameRenderer::draw_frame`] runs one iteration of the
//! per-frame protocol on slot `frame_counter % N`:
//!
//! 1. wait on the slot's `in_flight` fence (throttle)
//! 2. acquire the next swap chain image, signaling `image_available`
//! 3. reset the slot's fence
//! 4. re-record the slot's command buffer
//! 5. submit: wait `image_available`, signal `render_complete` and the fence
//! 6. present, waiting on `render_complete`
//! 7. advance the frame counter
//!
//! A stale swap chain (out-of-date acquire or present, suboptimal present,
//! window resize) is recreated internally and never reported as an error.
//! Frame contexts survive recreation.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::frame_context::{create_frame_contexts, destroy_frame_contexts, FrameContext};
use crate::graphics_device::{
    AcquireOutcome, ClearValue, CommandBufferHandle, CommandBufferUsage, Extent2D,
    GraphicsDevice, PipelineStage, Rect2D, RenderPassDesc, RenderPassHandle, SubmitDesc,
    SurfaceFormat, SwapchainConfig, Viewport,
};
use crate::log::Log;
use crate::swapchain::{select_config, SwapchainPreferences, SwapchainTargets};
use crate::window::WindowSurface;
use crate::{sandbox_debug, sandbox_error, sandbox_info, sandbox_trace};

/// Where the frame loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Acquiring,
    Recording,
    Submitted,
    Presenting,
    Recreating,
}

/// What one `draw_frame` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was rendered and queued for presentation
    Presented { image_index: u32 },
    /// The frame was presented, then the swap chain was recreated
    PresentedThenRecreated { image_index: u32 },
    /// Acquire found the swap chain out of date; nothing was rendered and the
    /// frame counter did not advance
    Skipped,
}

/// Scene drawn by the frame loop
pub trait SceneRecorder {
    /// Update slot-owned host-visible data (uniforms)
    ///
    /// Called after the slot's fence was waited on, so the GPU no longer reads
    /// the slot's previous data.
    fn update(&mut self, device: &mut dyn GraphicsDevice, slot: usize, extent: Extent2D) -> Result<()>;

    /// Record the draw inside the begun render pass
    ///
    /// Viewport and scissor are already set to the swap chain extent.
    fn record_draw(
        &self,
        device: &mut dyn GraphicsDevice,
        command_buffer: CommandBufferHandle,
        slot: usize,
    ) -> Result<()>;
}

/// Frame loop driver
///
/// Owns the render pass, the current swap chain generation and the frame
/// contexts. Must be destroyed explicitly with [`FrameRenderer::destroy`].
pub struct FrameRenderer {
    preferences: SwapchainPreferences,
    clear_color: [f32; 4],
    surface_format: SurfaceFormat,
    render_pass: RenderPassHandle,
    targets: Option<SwapchainTargets>,
    frames: Vec<FrameContext>,
    frame_counter: u64,
    recreation_count: u32,
    state: FrameState,
    log: Log,
}

impl FrameRenderer {
    /// Negotiate the swap chain and create the render pass, the render targets
    /// and `config.frames_in_flight` frame contexts
    pub fn new(
        device: &mut dyn GraphicsDevice,
        window: &dyn WindowSurface,
        config: &Config,
        log: Log,
    ) -> Result<Self> {
        config.validate()?;

        let support = device.query_swapchain_support()?;
        let swapchain_config = select_config(
            &support,
            &config.swapchain_preferences,
            window.frame_buffer_size(),
            &device.queue_family_indices(),
        )
        .map_err(|e| {
            sandbox_error!(log, "Swap chain negotiation failed: {}", e);
            e
        })?;
        let surface_format = swapchain_config.surface_format;

        let render_pass = device.create_render_pass(&RenderPassDesc { color_format: surface_format })?;

        let targets = match SwapchainTargets::create(device, swapchain_config, render_pass, &log) {
            Ok(targets) => targets,
            Err(e) => {
                device.destroy_render_pass(render_pass);
                return Err(e);
            }
        };

        let frames = match create_frame_contexts(device, config.frames_in_flight, &log) {
            Ok(frames) => frames,
            Err(e) => {
                targets.destroy(device);
                device.destroy_render_pass(render_pass);
                return Err(e);
            }
        };

        sandbox_info!(
            log,
            "Frame renderer ready: {} frames in flight, {} swap chain images",
            frames.len(),
            targets.image_count()
        );

        Ok(Self {
            preferences: config.swapchain_preferences.clone(),
            clear_color: config.clear_color,
            surface_format,
            render_pass,
            targets: Some(targets),
            frames,
            frame_counter: 0,
            recreation_count: 0,
            state: FrameState::Idle,
            log,
        })
    }

    /// Run one iteration of the frame protocol
    ///
    /// # Returns
    ///
    /// What happened to the frame. Errors are fatal.
    pub fn draw_frame(
        &mut self,
        device: &mut dyn GraphicsDevice,
        window: &mut dyn WindowSurface,
        scene: &mut dyn SceneRecorder,
    ) -> Result<FrameOutcome> {
        let slot = (self.frame_counter % self.frames.len() as u64) as usize;
        let frame = self.frames[slot];
        let targets = self.current_targets()?;
        let swapchain = targets.swapchain();
        let extent = targets.extent();

        // 1. Throttle
        self.state = FrameState::Acquiring;
        device.wait_for_fence(frame.in_flight())?;

        // 2. Acquire
        let image_index = match device.acquire_next_image(swapchain, frame.image_available())? {
            AcquireOutcome::Acquired { image_index, suboptimal } => {
                if suboptimal {
                    sandbox_trace!(self.log, "Acquired suboptimal image {}", image_index);
                }
                image_index
            }
            AcquireOutcome::OutOfDate => {
                sandbox_debug!(self.log, "Swap chain out of date on acquire");
                self.recreate(device, window)?;
                return Ok(FrameOutcome::Skipped);
            }
        };

        // 3. The fence is only reset once work will definitely be submitted
        device.reset_fence(frame.in_flight())?;

        // 4. Record
        self.state = FrameState::Recording;
        scene.update(device, slot, extent)?;
        self.record(device, frame.command_buffer(), image_index, extent, slot, scene)?;

        // 5. Submit
        device
            .submit(&SubmitDesc {
                command_buffer: frame.command_buffer(),
                wait: Some((frame.image_available(), PipelineStage::ColorAttachmentOutput)),
                signal: Some(frame.render_complete()),
                fence: Some(frame.in_flight()),
            })
            .map_err(|e| {
                sandbox_error!(self.log, "Frame {} submission failed: {}", self.frame_counter, e);
                e
            })?;
        self.state = FrameState::Submitted;

        // 6. Present
        self.state = FrameState::Presenting;
        let presented = device.present(swapchain, image_index, frame.render_complete())?;

        // 7. Advance
        self.frame_counter += 1;

        if presented.needs_recreation() || window.has_resized() {
            sandbox_debug!(
                self.log,
                "Recreating swap chain after present ({:?}, resized: {})",
                presented,
                window.has_resized()
            );
            self.recreate(device, window)?;
            return Ok(FrameOutcome::PresentedThenRecreated { image_index });
        }

        self.state = FrameState::Idle;
        Ok(FrameOutcome::Presented { image_index })
    }

    fn record(
        &self,
        device: &mut dyn GraphicsDevice,
        command_buffer: CommandBufferHandle,
        image_index: u32,
        extent: Extent2D,
        slot: usize,
        scene: &dyn SceneRecorder,
    ) -> Result<()> {
        let framebuffer = self
            .current_targets()?
            .framebuffer(image_index)
            .ok_or_else(|| Error::InvalidResource(format!("No framebuffer for image {}", image_index)))?;

        device.begin_command_buffer(command_buffer, CommandBufferUsage::Reusable)?;
        device.cmd_begin_render_pass(
            command_buffer,
            self.render_pass,
            framebuffer,
            extent,
            ClearValue::Color(self.clear_color),
        )?;
        device.cmd_set_viewport(
            command_buffer,
            Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            },
        )?;
        device.cmd_set_scissor(
            command_buffer,
            Rect2D {
                x: 0,
                y: 0,
                width: extent.width,
                height: extent.height,
            },
        )?;
        scene.record_draw(device, command_buffer, slot)?;
        device.cmd_end_render_pass(command_buffer)?;
        device.end_command_buffer(command_buffer)
    }

    /// Rebuild the swap chain, its image views and framebuffers
    ///
    /// Blocks on window events while the window is minimized. Frame contexts,
    /// render pass and pipelines are kept.
    ///
    /// # Returns
    ///
    /// `false` when the window was asked to close while minimized; the old
    /// swap chain is then left untouched.
    pub fn recreate(
        &mut self,
        device: &mut dyn GraphicsDevice,
        window: &mut dyn WindowSurface,
    ) -> Result<bool> {
        self.state = FrameState::Recreating;

        let (mut width, mut height) = window.frame_buffer_size();
        while width == 0 || height == 0 {
            if window.should_close() {
                sandbox_debug!(self.log, "Window closed while minimized, recreation abandoned");
                self.state = FrameState::Idle;
                return Ok(false);
            }
            window.wait_events();
            (width, height) = window.frame_buffer_size();
        }

        device.wait_idle()?;

        if let Some(old) = self.targets.take() {
            old.destroy(device);
        }

        let support = device.query_swapchain_support()?;
        let config = select_config(
            &support,
            &self.preferences,
            (width, height),
            &device.queue_family_indices(),
        )?;
        self.check_format(&config)?;

        self.targets = Some(SwapchainTargets::create(device, config, self.render_pass, &self.log)?);
        window.reset_resized();
        self.recreation_count += 1;
        self.state = FrameState::Idle;

        sandbox_info!(self.log, "Swap chain recreated ({}x{})", width, height);
        Ok(true)
    }

    /// The render pass and pipelines were built for one surface format
    fn check_format(&self, config: &SwapchainConfig) -> Result<()> {
        if config.surface_format != self.surface_format {
            let err = Error::UnsupportedConfiguration(format!(
                "Surface format changed from {:?} to {:?}",
                self.surface_format, config.surface_format
            ));
            sandbox_error!(self.log, "{}", err);
            return Err(err);
        }
        Ok(())
    }

    /// Destroy frame contexts, render targets and render pass
    ///
    /// The device must be idle.
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        destroy_frame_contexts(device, self.frames);
        if let Some(targets) = self.targets {
            targets.destroy(device);
        }
        device.destroy_render_pass(self.render_pass);
    }

    fn current_targets(&self) -> Result<&SwapchainTargets> {
        self.targets
            .as_ref()
            .ok_or_else(|| Error::InvalidResource("Swap chain is not available".to_string()))
    }

    pub fn render_pass(&self) -> RenderPassHandle {
        self.render_pass
    }

    /// Current swap chain extent
    pub fn extent(&self) -> Extent2D {
        self.targets.as_ref().map(|t| t.extent()).unwrap_or_default()
    }

    pub fn swapchain_config(&self) -> Option<&SwapchainConfig> {
        self.targets.as_ref().map(|t| t.config())
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_context(&self, slot: usize) -> Option<&FrameContext> {
        self.frames.get(slot)
    }

    /// Number of completed iterations
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn recreation_count(&self) -> u32 {
        self.recreation_count
    }

    pub fn state(&self) -> FrameState {
        self.state
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
