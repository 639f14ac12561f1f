//! Swap chain configuration negotiation
//!
//! Pure functions turning a surface support snapshot, the application's
//! ordered preferences and the current frame-buffer size into a
//! `SwapchainConfig`. Selection is deterministic: the first preference the
//! surface supports wins.

use crate::error::{Error, Result};
use crate::graphics_device::{
    Extent2D, PresentMode, SharingMode, SurfaceCapabilities, SurfaceFormat, SwapchainConfig,
    SwapchainSupportInfo,
};

/// Ordered swap chain preferences, most preferred first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapchainPreferences {
    surface_formats: Vec<SurfaceFormat>,
    present_modes: Vec<PresentMode>,
}

impl SwapchainPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an acceptable surface format (format and color space must both match)
    pub fn add_surface_format(mut self, surface_format: SurfaceFormat) -> Self {
        self.surface_formats.push(surface_format);
        self
    }

    /// Append an acceptable present mode
    pub fn add_present_mode(mut self, present_mode: PresentMode) -> Self {
        self.present_modes.push(present_mode);
        self
    }

    pub fn surface_formats(&self) -> &[SurfaceFormat] {
        &self.surface_formats
    }

    pub fn present_modes(&self) -> &[PresentMode] {
        &self.present_modes
    }

    /// First preferred surface format offered by the surface
    pub fn select_surface_format(&self, available: &[SurfaceFormat]) -> Result<SurfaceFormat> {
        self.surface_formats
            .iter()
            .find(|preferred| available.contains(preferred))
            .copied()
            .ok_or_else(|| {
                Error::UnsupportedConfiguration(
                    "Could not find acceptable swap chain surface format".to_string(),
                )
            })
    }

    /// First preferred present mode offered by the surface
    pub fn select_present_mode(&self, available: &[PresentMode]) -> Result<PresentMode> {
        self.present_modes
            .iter()
            .find(|preferred| available.contains(preferred))
            .copied()
            .ok_or_else(|| {
                Error::UnsupportedConfiguration(
                    "Could not find acceptable swap chain present mode".to_string(),
                )
            })
    }
}

/// One more image than the minimum, capped by the maximum (0 = unbounded)
pub fn choose_image_count(capabilities: &SurfaceCapabilities) -> u32 {
    let desired = capabilities.min_image_count.saturating_add(1);
    if capabilities.max_image_count != 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// The surface's current extent, or the frame-buffer size clamped into the
/// supported range when the surface leaves it undefined
pub fn choose_extent(capabilities: &SurfaceCapabilities, frame_buffer_size: (u32, u32)) -> Extent2D {
    if capabilities.current_extent.width != SurfaceCapabilities::UNDEFINED_EXTENT {
        return capabilities.current_extent;
    }

    let (width, height) = frame_buffer_size;
    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;

    // max() then min() so an inverted range cannot panic
    Extent2D::new(width.max(min.width).min(max.width), height.max(min.height).min(max.height))
}

/// Distinct queue families (sorted) and the matching sharing mode
pub fn sharing_mode(queue_family_indices: &[u32]) -> (Vec<u32>, SharingMode) {
    let mut families = queue_family_indices.to_vec();
    families.sort_unstable();
    families.dedup();

    if families.len() > 1 {
        (families.clone(), SharingMode::Concurrent(families))
    } else {
        (families, SharingMode::Exclusive)
    }
}

/// Negotiate a swap chain configuration
///
/// # Arguments
///
/// * `support` - Surface support snapshot, queried for this (re)creation
/// * `preferences` - Ordered surface format and present mode preferences
/// * `frame_buffer_size` - Window frame-buffer size in pixels
/// * `queue_family_indices` - Graphics and present families (duplicates allowed)
///
/// # Returns
///
/// `Error::UnsupportedConfiguration` when no preferred format or present mode
/// is supported
pub fn select_config(
    support: &SwapchainSupportInfo,
    preferences: &SwapchainPreferences,
    frame_buffer_size: (u32, u32),
    queue_family_indices: &[u32],
) -> Result<SwapchainConfig> {
    let surface_format = preferences.select_surface_format(&support.formats)?;
    let present_mode = preferences.select_present_mode(&support.present_modes)?;
    let capabilities = &support.capabilities;
    let (queue_family_indices, sharing_mode) = sharing_mode(queue_family_indices);

    Ok(SwapchainConfig {
        surface_format,
        present_mode,
        image_count: choose_image_count(capabilities),
        extent: choose_extent(capabilities, frame_buffer_size),
        queue_family_indices,
        sharing_mode,
        pre_transform: capabilities.current_transform,
    })
}

#[cfg(test)]
#[path = "negotiator_tests.rs"]
mod tests;
