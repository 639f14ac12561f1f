/// Swap chain value types - surface capabilities, negotiated configuration and
/// presentation outcomes

use bitflags::bitflags;

/// Pixel format of a presentable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    /// Any other driver format (raw value)
    Other(i32),
}

/// Color space of a presentable surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonLinear,
    /// Any other driver color space (raw value)
    Other(i32),
}

/// Format + color space pair offered by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

impl SurfaceFormat {
    pub const fn new(format: Format, color_space: ColorSpace) -> Self {
        Self { format, color_space }
    }
}

/// Presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    /// No vsync, may tear
    Immediate,
    /// Triple-buffered vsync, replaces queued image
    Mailbox,
    /// Vsync queue, always supported
    Fifo,
    /// Vsync queue, tears when late
    FifoRelaxed,
    /// Any other driver present mode (raw value)
    Other(i32),
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (minimized window)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height (1.0 for empty extents)
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

bitflags! {
    /// Surface transform applied by the presentation engine
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SurfaceTransform: u32 {
        const IDENTITY = 0x0000_0001;
        const ROTATE_90 = 0x0000_0002;
        const ROTATE_180 = 0x0000_0004;
        const ROTATE_270 = 0x0000_0008;
        const HORIZONTAL_MIRROR = 0x0000_0010;
        const HORIZONTAL_MIRROR_ROTATE_90 = 0x0000_0020;
        const HORIZONTAL_MIRROR_ROTATE_180 = 0x0000_0040;
        const HORIZONTAL_MIRROR_ROTATE_270 = 0x0000_0080;
        const INHERIT = 0x0000_0100;
    }
}

/// Surface capabilities reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means "no upper bound"
    pub max_image_count: u32,
    /// `width == u32::MAX` means the surface lets the swap chain decide
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
    pub current_transform: SurfaceTransform,
}

impl SurfaceCapabilities {
    /// Value of `current_extent.width` meaning "undefined"
    pub const UNDEFINED_EXTENT: u32 = u32::MAX;
}

/// Snapshot of what a surface supports, queried on every (re)creation
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainSupportInfo {
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
}

/// How swap chain images are shared between queue families
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharingMode {
    /// Owned by a single family
    Exclusive,
    /// Usable by every listed family (sorted, distinct)
    Concurrent(Vec<u32>),
}

/// Negotiated swap chain configuration
///
/// Immutable for the lifetime of one swap chain; a new one is negotiated on
/// every recreation.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainConfig {
    pub surface_format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub image_count: u32,
    pub extent: Extent2D,
    /// Distinct queue families that touch the images, sorted
    pub queue_family_indices: Vec<u32>,
    pub sharing_mode: SharingMode,
    pub pre_transform: SurfaceTransform,
}

/// Result of acquiring the next swap chain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired; `suboptimal` still allows rendering to it
    Acquired { image_index: u32, suboptimal: bool },
    /// The swap chain no longer matches the surface and must be recreated
    OutOfDate,
}

/// Result of presenting a swap chain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Presented, but the swap chain should be recreated
    Suboptimal,
    /// Not presented, the swap chain must be recreated
    OutOfDate,
}

impl PresentOutcome {
    /// True when the swap chain should be recreated
    pub fn needs_recreation(&self) -> bool {
        !matches!(self, PresentOutcome::Presented)
    }
}
