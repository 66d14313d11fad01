//! Progressive GPU ray tracer.
//!
//! Every frame the compute kernel traces one jittered sample per pixel into a raw image, which is
//! folded into a running average and drawn to the window. Moving the camera or resizing the window
//! restarts the average.
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
};

mod accumulation;
mod compositor;
mod dispatch;
mod error;
mod helper;
mod resources;
mod session;
mod state;

pub use accumulation::{AccumulationController, AccumulationPhase, FrameBlend};
pub use compositor::{CompositeUniform, Compositor};
pub use dispatch::{draw_jitter, workgroup_count, FrameDispatcher, KernelParameters, WORKGROUP_SIZE};
pub use error::{RenderError, Result};
pub use helper::{setup_camera, setup_environment};
pub use resources::{
    GeometryBuffer, GpuAllocator, OutputTargets, ResourceManager, WgpuAllocator, WgpuResources, PRESENTED_TEXEL_SIZE,
    RAW_FORMAT,
};
pub use session::{load_kernel_source, RenderSession, BUILTIN_KERNEL};

use crate::state::State;

pub const DEFAULT_CONFIG_PATH: &str = "res/config.toml";

/// Starts the application.
///
/// This function initializes the logger, creates the window, and starts the event loop.
/// Logging goes through `env_logger`, configured with `RUST_LOG`.
///
/// The event loop handles:
/// - Activating the render session when the application resumes and releasing it when it is suspended or exits
/// - Closing the window when requested by the user or when the escape key is pressed
/// - Updating and rendering the state when a redraw is requested
/// - Resizing the state when the window size changes
/// - Processing mouse motion events
///
/// # Errors
///
/// Returns an error if the config can't be loaded, no GPU is available, or the kernel program is missing or invalid.
pub async fn run(config_path: Option<String>) -> anyhow::Result<()> {
    env_logger::init();

    let config_path = config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    log::info!("Using config file: {}", config_path);

    let event_loop = EventLoop::new()?;
    let title = env!("CARGO_PKG_NAME");
    let window = winit::window::WindowBuilder::new()
        .with_title(title)
        .with_inner_size(winit::dpi::LogicalSize::new(1200.0, 800.0))
        .build(&event_loop)?;

    // ControlFlow::Poll continuously runs the event loop,
    // even if the OS hasn't dispatched any events.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut state = State::new(window, &config_path).await?;
    let mut last_render_time = instant::Instant::now();

    event_loop.run(move |event, elwt| match event {
        Event::Resumed => state.activate(),
        Event::Suspended | Event::LoopExiting => state.deactivate(),
        Event::WindowEvent { ref event, window_id } if window_id == state.window.id() && !state.input(event) => {
            match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            logical_key: Key::Named(NamedKey::Escape),
                            ..
                        },
                    ..
                } => elwt.exit(),
                WindowEvent::RedrawRequested => {
                    let now = instant::Instant::now();
                    let dt = now - last_render_time;
                    last_render_time = now;
                    state.update(dt);
                    match state.render() {
                        Ok(_) => {}
                        // Reconfigure the surface if it's lost or outdated
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => state.resize(state.size),
                        // The system is out of memory, we should probably quit
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("Surface out of memory");
                            elwt.exit()
                        }
                        // We're ignoring timeouts
                        Err(wgpu::SurfaceError::Timeout) => log::warn!("Surface timeout"),
                    }
                }
                WindowEvent::Resized(physical_size) => state.resize(*physical_size),
                WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                    log::debug!("Window={window_id:?} changed scale to {scale_factor}");
                }
                _ => {}
            }
        }
        Event::DeviceEvent {
            event: DeviceEvent::MouseMotion { delta },
            ..
        } => {
            if state.mouse_pressed {
                state.camera_controller.process_mouse(delta.0, delta.1)
            }
        }
        // Request a redraw before the system goes to idle
        Event::AboutToWait => state.window.request_redraw(),
        _ => (),
    })?;

    Ok(())
}
