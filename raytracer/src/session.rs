use std::borrow::Cow;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use scene::{generate, Camera, Config, DirectionalLight, Projection, SceneSettings};

use crate::accumulation::AccumulationController;
use crate::compositor::Compositor;
use crate::dispatch::{draw_jitter, FrameDispatcher, KernelParameters};
use crate::error::{RenderError, Result};
use crate::helper::setup_environment;
use crate::resources::{WgpuAllocator, WgpuResources};

/// Kernel used when the config has no `[kernel]` path.
pub const BUILTIN_KERNEL: &str = include_str!("../../res/shader/raytrace.wgsl");

/// Reads the kernel program, falling back to the built-in one.
pub fn load_kernel_source(path: Option<&str>) -> Result<Cow<'static, str>> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map(Cow::Owned)
            .map_err(|source| RenderError::MissingKernel {
                path: PathBuf::from(path),
                source,
            }),
        None => Ok(Cow::Borrowed(BUILTIN_KERNEL)),
    }
}

/// State of one progressive rendering session.
///
/// The session owns the pipelines, the GPU buffers and the accumulation state. It is created
/// once, activated whenever the window becomes visible and deactivated when it goes away.
pub struct RenderSession {
    dispatcher: FrameDispatcher,
    compositor: Compositor,
    resources: WgpuResources,
    accumulation: AccumulationController,
    settings: SceneSettings,
    light: DirectionalLight,
    scene_rng: StdRng,
    jitter_rng: StdRng,
    active: bool,
}

impl RenderSession {
    /// Checks the preconditions and builds the pipelines.
    ///
    /// Fails when no light is configured, the kernel can't be read or doesn't validate, or the
    /// scene settings are degenerate.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        userconfig: &Config,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let light = userconfig.light.ok_or(RenderError::MissingLight)?;
        userconfig.scene.validate()?;

        let kernel_source = load_kernel_source(userconfig.kernel_path.as_deref())?;
        let environment = setup_environment(userconfig, device, queue)?;
        let dispatcher = FrameDispatcher::new(device, &kernel_source, &environment)?;
        let compositor = Compositor::new(device, surface_format);

        let scene_rng = match userconfig.scene.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            dispatcher,
            compositor,
            resources: WgpuResources::new(),
            accumulation: AccumulationController::new(),
            settings: userconfig.scene,
            light,
            scene_rng,
            jitter_rng: StdRng::from_entropy(),
            active: false,
        })
    }

    /// Generates a new scene, uploads it and restarts accumulation.
    pub fn on_activate(&mut self, device: &wgpu::Device) -> Result<()> {
        let scene = generate(&self.settings, &mut self.scene_rng)?;
        self.resources.upload_scene(&WgpuAllocator::new(device), &scene)?;
        self.accumulation.on_scene_regenerated();
        self.active = true;
        log::info!("Render session activated");
        Ok(())
    }

    /// Releases every GPU buffer. Safe to call when already inactive.
    pub fn on_deactivate(&mut self) {
        self.resources.release();
        if self.active {
            log::info!("Render session deactivated");
        }
        self.active = false;
    }

    pub fn on_view_changed(&mut self) {
        self.accumulation.on_view_changed();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sample_count(&self) -> u32 {
        self.accumulation.sample_count()
    }

    pub fn resources(&self) -> &WgpuResources {
        &self.resources
    }

    /// Makes sure the output buffers match the viewport. Runs before the surface texture is
    /// acquired, so a failure leaves the previous image on screen.
    pub fn prepare_frame(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<()> {
        if !self.active || self.resources.geometry().is_none() {
            return Err(RenderError::Inactive);
        }
        if self.resources.ensure_output_buffer(&WgpuAllocator::new(device), width, height)? {
            self.accumulation.on_output_recreated(width, height);
        }
        Ok(())
    }

    /// Traces one sample, folds it into the presented image and draws that into `destination`.
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera: &Camera,
        projection: &Projection,
        destination: &wgpu::TextureView,
    ) -> Result<()> {
        let (Some(output), Some(geometry)) = (self.resources.output(), self.resources.geometry()) else {
            return Err(RenderError::Inactive);
        };

        let parameters = KernelParameters::new(
            camera.camera_to_world(),
            projection.calc_matrix(),
            self.light.to_vec4(),
            draw_jitter(&mut self.jitter_rng),
            self.resources.sphere_count(),
        )?;
        let blend = self.accumulation.begin_frame();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        self.dispatcher
            .dispatch(device, queue, &mut encoder, &parameters, output, geometry);
        self.compositor
            .encode(device, queue, &mut encoder, blend, output, destination);
        queue.submit(std::iter::once(encoder.finish()));

        self.accumulation.complete_frame();
        Ok(())
    }
}
