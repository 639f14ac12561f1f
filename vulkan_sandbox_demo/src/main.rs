/// Vulkan Sandbox demo
///
/// Opens a window and renders a spinning quad with N frames in flight until
/// the window is closed. Exit code 0 on a clean shutdown, 1 on any fatal
/// error (logged at error severity).
///
/// Shaders are read as SPIR-V from `shaders/*.spv`; compile them from the
/// GLSL sources first:
///
/// ```text
/// glslc shaders/quad.vert -o shaders/quad.vert.spv
/// glslc shaders/quad.frag -o shaders/quad.frag.spv
/// ```

mod app_window;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use app_window::AppWindow;
use vulkan_sandbox::sandbox::frame::{FrameOutcome, FrameRenderer};
use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::render::GraphicsDevice;
use vulkan_sandbox::sandbox::scene::QuadScene;
use vulkan_sandbox::sandbox::{load_spirv, Config, Result, WindowSurface};
use vulkan_sandbox::{sandbox_debug, sandbox_error, sandbox_info};
use vulkan_sandbox_renderer_vulkan::{print_validation_stats_report, VulkanGraphicsDevice};

fn main() -> ExitCode {
    let config = Config::default();
    let log = Log::console("sandbox", config.log_severity);

    match run(&config, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            sandbox_error!(log, "Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Relative shader paths are tried in the working directory, then next to
/// the demo's manifest
fn shader_path(path: &Path) -> PathBuf {
    if path.is_relative() && !path.exists() {
        let beside_manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join(path);
        if beside_manifest.exists() {
            return beside_manifest;
        }
    }
    path.to_path_buf()
}

fn run(config: &Config, log: &Log) -> Result<()> {
    config.validate()?;

    let vertex_spirv = load_spirv(shader_path(&config.vertex_shader_path))?;
    let fragment_spirv = load_spirv(shader_path(&config.fragment_shader_path))?;

    let mut window = AppWindow::new(config, log.with_source("sandbox::window"))?;
    let mut device = VulkanGraphicsDevice::new(window.window(), config, log.clone())?;

    let mut renderer = FrameRenderer::new(&mut device, &window, config, log.with_source("sandbox::frame"))?;
    let mut scene = match QuadScene::new(
        &mut device,
        renderer.render_pass(),
        vertex_spirv,
        fragment_spirv,
        config.frames_in_flight,
        log.with_source("sandbox::scene"),
    ) {
        Ok(scene) => scene,
        Err(e) => {
            device.wait_idle().ok();
            renderer.destroy(&mut device);
            return Err(e);
        }
    };

    sandbox_info!(log, "Rendering on '{}'", device.device_name());

    let mut result = Ok(());
    let mut skipped = 0u64;
    while !window.should_close() {
        window.poll_events();
        if window.should_close() {
            break;
        }
        match renderer.draw_frame(&mut device, &mut window, &mut scene) {
            Ok(FrameOutcome::Skipped) => skipped += 1,
            Ok(_) => {}
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    sandbox_debug!(
        log,
        "Shutting down after {} frames ({} skipped, {} swap chain recreations)",
        renderer.frame_counter(),
        skipped,
        renderer.recreation_count()
    );

    // Nothing may be in flight when the frame resources go away
    if let Err(e) = device.wait_idle() {
        sandbox_error!(log, "Wait idle failed during shutdown: {}", e);
    }
    scene.destroy(&mut device);
    renderer.destroy(&mut device);

    let stats = device.validation_stats();
    drop(device);
    if let Some(stats) = stats {
        print_validation_stats_report(&stats);
    }

    result
}
