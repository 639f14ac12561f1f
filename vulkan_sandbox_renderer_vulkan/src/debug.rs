/// Vulkan debug messenger - routes validation layer messages into the log
///
/// The messenger owns a boxed state (log context, filter, counters) whose
/// address is handed to the driver as callback user data. The state must
/// outlive the messenger, so both are destroyed together.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::{c_void, CStr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use vulkan_sandbox::sandbox::log::{Log, LogSeverity};
use vulkan_sandbox::sandbox::DebugSeverity;

use crate::vulkan_error::init_error;

/// Name of the Khronos validation layer
pub(crate) const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Validation message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// State reachable from the callback
struct DebugState {
    log: Log,
    severity: DebugSeverity,
    panic_on_error: bool,
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
    /// Occurrences per message, for repeat markers
    messages: Mutex<FxHashMap<String, u32>>,
}

impl DebugState {
    fn stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn track_message(&self, message: &str) -> u32 {
        match self.messages.lock() {
            Ok(mut messages) => {
                let count = messages.entry(message.to_string()).or_insert(0);
                *count += 1;
                *count
            }
            Err(_) => 1,
        }
    }
}

/// Debug utils messenger and its callback state
pub(crate) struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    state: Box<DebugState>,
}

impl DebugMessenger {
    /// Create the messenger
    ///
    /// # Arguments
    ///
    /// * `severity` - Which validation messages are forwarded
    /// * `panic_on_error` - Panic on the first validation error
    /// * `log` - Context receiving the messages
    pub(crate) fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        severity: DebugSeverity,
        panic_on_error: bool,
        log: Log,
    ) -> vulkan_sandbox::Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let state = Box::new(DebugState {
            log,
            severity,
            panic_on_error,
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
            messages: Mutex::new(FxHashMap::default()),
        });

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(severity_flags(severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback))
            .user_data(&*state as *const DebugState as *mut c_void);

        let messenger = unsafe { loader.create_debug_utils_messenger(&debug_info, None) }
            .map_err(|e| init_error(&state.log, "Failed to create debug messenger", e))?;

        Ok(Self { loader, messenger, state })
    }

    pub(crate) fn stats(&self) -> ValidationStats {
        self.state.stats()
    }

    /// Destroy the messenger, then its state
    ///
    /// # Safety
    ///
    /// The instance it was created from must still be alive.
    pub(crate) unsafe fn destroy(self) {
        self.loader.destroy_debug_utils_messenger(self.messenger, None);
    }
}

/// Severities the driver should report
pub(crate) fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

/// Log severity of a validation message
pub(crate) fn log_severity(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Trace
    }
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Print the counters to stdout
pub fn print_validation_stats_report(stats: &ValidationStats) {
    if stats.total() == 0 {
        println!("\n{}", "✓ No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());
    println!("{}\n", "====================================".bright_blue().bold());
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> &'a str {
    if ptr.is_null() {
        fallback
    } else {
        CStr::from_ptr(ptr).to_str().unwrap_or("Invalid UTF-8")
    }
}

/// Called by the validation layers
unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }
    let state = &*(user_data as *const DebugState);
    let callback_data = *p_callback_data;
    let message_id_name = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    let severity = log_severity(message_severity);
    let counter = match severity {
        LogSeverity::Error => &state.errors,
        LogSeverity::Warn => &state.warnings,
        LogSeverity::Info => &state.info,
        _ => &state.verbose,
    };
    counter.fetch_add(1, Ordering::Relaxed);

    let occurrences = state.track_message(message);
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };
    let type_name = message_type_name(message_type);

    state.log.log(
        severity,
        format!("[{}]{} {}: {}", type_name, repeat, message_id_name, message),
    );

    if state.panic_on_error && severity == LogSeverity::Error {
        panic!(
            "Validation error (panic_on_validation_error)\nMessage ID: {}\nType: {}\nMessage: {}",
            message_id_name, type_name, message
        );
    }

    vk::FALSE
}
