//! Queue plan and physical device selection
//!
//! The application describes the queues it needs as a `QueuePlan` (named
//! queues with capability constraints). Each candidate physical device is
//! summarized as a `PhysicalDeviceInfo`, scored against the plan, and the
//! best-scoring device wins. The plan is then resolved into concrete queue
//! family indices for logical device creation.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Name of the queue used for graphics submissions
pub const GRAPHICS_QUEUE: &str = "graphics";

/// Name of the queue used for presentation
pub const PRESENT_QUEUE: &str = "present";

/// Score bonus for discrete GPUs
pub const DISCRETE_GPU_BONUS: u32 = 10_000;

/// Score bonus for integrated GPUs
pub const INTEGRATED_GPU_BONUS: u32 = 100;

bitflags! {
    /// Operations a queue family supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueueCapabilities: u32 {
        const GRAPHICS = 0x0000_0001;
        const COMPUTE = 0x0000_0002;
        const TRANSFER = 0x0000_0004;
    }
}

/// Requirements placed on one planned queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConstraints {
    /// Capabilities the family must have (all of them)
    pub capabilities: QueueCapabilities,
    /// The family must be able to present to the window surface
    pub requires_present: bool,
}

impl QueueConstraints {
    /// A queue able to record graphics work
    pub const fn graphics() -> Self {
        Self {
            capabilities: QueueCapabilities::GRAPHICS,
            requires_present: false,
        }
    }

    /// A queue able to present to the surface
    pub const fn present() -> Self {
        Self {
            capabilities: QueueCapabilities::empty(),
            requires_present: true,
        }
    }
}

/// Named queues the application needs
#[derive(Debug, Clone, Default)]
pub struct QueuePlan {
    queues: Vec<(String, QueueConstraints)>,
}

impl QueuePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graphics queue plus present queue (possibly the same family)
    pub fn graphics_and_present() -> Self {
        Self::new()
            .add_queue(GRAPHICS_QUEUE, QueueConstraints::graphics())
            .add_queue(PRESENT_QUEUE, QueueConstraints::present())
    }

    /// Add a named queue; a later queue with the same name replaces the earlier one
    pub fn add_queue(mut self, name: &str, constraints: QueueConstraints) -> Self {
        if let Some(entry) = self.queues.iter_mut().find(|(n, _)| n == name) {
            entry.1 = constraints;
        } else {
            self.queues.push((name.to_string(), constraints));
        }
        self
    }

    /// Planned queues in insertion order
    pub fn queues(&self) -> impl Iterator<Item = (&str, &QueueConstraints)> {
        self.queues.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

/// Kind of physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalDeviceType {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

/// One queue family of a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub capabilities: QueueCapabilities,
    pub queue_count: u32,
    /// Can present to the window surface
    pub supports_present: bool,
}

impl QueueFamilyInfo {
    /// Whether this family satisfies a queue's constraints
    pub fn satisfies(&self, constraints: &QueueConstraints) -> bool {
        self.queue_count > 0
            && self.capabilities.contains(constraints.capabilities)
            && (!constraints.requires_present || self.supports_present)
    }
}

/// Everything device selection needs to know about a physical device
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalDeviceInfo {
    pub name: String,
    pub device_type: PhysicalDeviceType,
    pub queue_families: Vec<QueueFamilyInfo>,
    pub supported_extensions: Vec<String>,
    /// Number of surface formats offered for the window surface
    pub surface_format_count: usize,
    /// Number of present modes offered for the window surface
    pub present_mode_count: usize,
}

impl PhysicalDeviceInfo {
    /// First queue family satisfying the constraints
    pub fn select_queue_family(&self, constraints: &QueueConstraints) -> Option<u32> {
        self.queue_families
            .iter()
            .position(|family| family.satisfies(constraints))
            .map(|index| index as u32)
    }

    /// Whether every required extension is supported
    pub fn supports_extensions(&self, required_extensions: &[&str]) -> bool {
        required_extensions
            .iter()
            .all(|ext| self.supported_extensions.iter().any(|s| s == ext))
    }

    /// Suitability score, higher is better, 0 means unusable
    pub fn score(&self, plan: &QueuePlan, required_extensions: &[&str]) -> u32 {
        let queues_satisfied = plan
            .queues()
            .all(|(_, constraints)| self.select_queue_family(constraints).is_some());

        if !queues_satisfied || !self.supports_extensions(required_extensions) {
            return 0;
        }

        // A surface without formats or present modes cannot host a swap chain
        if self.surface_format_count == 0 || self.present_mode_count == 0 {
            return 0;
        }

        let mut score = 1;
        match self.device_type {
            PhysicalDeviceType::DiscreteGpu => score += DISCRETE_GPU_BONUS,
            PhysicalDeviceType::IntegratedGpu => score += INTEGRATED_GPU_BONUS,
            _ => {}
        }
        score
    }

    /// Map every planned queue to a queue family index
    pub fn resolve_queue_plan(&self, plan: &QueuePlan) -> Result<QueueAssignment> {
        let mut families = FxHashMap::default();

        for (name, constraints) in plan.queues() {
            let family = self.select_queue_family(constraints).ok_or_else(|| {
                Error::UnsupportedConfiguration(format!(
                    "Device '{}' has no queue family for queue '{}'",
                    self.name, name
                ))
            })?;
            families.insert(name.to_string(), family);
        }

        Ok(QueueAssignment { families })
    }
}

/// Queue family chosen for each planned queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueAssignment {
    families: FxHashMap<String, u32>,
}

impl QueueAssignment {
    /// Family index of a planned queue
    pub fn family(&self, name: &str) -> Option<u32> {
        self.families.get(name).copied()
    }

    /// Distinct family indices, sorted
    pub fn distinct_families(&self) -> Vec<u32> {
        let mut families: Vec<u32> = self.families.values().copied().collect();
        families.sort_unstable();
        families.dedup();
        families
    }
}

/// Pick the best device for a plan
///
/// # Returns
///
/// Index into `devices` of the highest strictly positive score (the first one
/// wins ties), or `Error::UnsupportedConfiguration` when no device qualifies
pub fn select_physical_device(
    devices: &[PhysicalDeviceInfo],
    plan: &QueuePlan,
    required_extensions: &[&str],
) -> Result<usize> {
    let mut best: Option<(usize, u32)> = None;

    for (index, device) in devices.iter().enumerate() {
        let score = device.score(plan, required_extensions);
        if score == 0 {
            continue;
        }
        if best.map_or(true, |(_, high)| score > high) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index)
        .ok_or_else(|| Error::UnsupportedConfiguration("No suitable vulkan devices".to_string()))
}

#[cfg(test)]
#[path = "device_selection_tests.rs"]
mod tests;
