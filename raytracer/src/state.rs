use anyhow::Context;
use winit::{
    event::*,
    keyboard::Key,
    window::Window,
};

use scene::{Camera, CameraController, Config, Projection};
use wgpu_utils::setup_gpu;

use crate::helper::setup_camera;
use crate::session::RenderSession;

pub struct State {
    // The surface borrows the window handle, so it is declared (and dropped) first
    surface: wgpu::Surface<'static>,
    session: RenderSession,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    //Camera
    camera: Camera,
    projection: Projection,
    pub camera_controller: CameraController,
    pub mouse_pressed: bool,
    pub window: Window,
}

impl State {
    /// Constructs a new `State` instance.
    ///
    /// Reads the config, initializes the gpu, sets up the camera and builds the render session.
    /// The session is not active until [`State::activate`] is called.
    ///
    /// # Errors
    ///
    /// Fails if the config can't be read, no GPU is available, or the session preconditions
    /// (light, kernel program, environment map) are not met.
    pub async fn new(window: Window, config_path: &str) -> anyhow::Result<Self> {
        let userconfig = Config::new(config_path).with_context(|| format!("Failed to load config {}", config_path))?;

        //---------Setup Hardware---------
        let (surface, device, queue, config) = setup_gpu(&window).await?;
        log::info!("Hardware initialized");

        //-------------Camera-------------
        let (camera, projection, camera_controller) = setup_camera(&config, &userconfig);

        //-------------Session------------
        let session = RenderSession::new(&device, &queue, &userconfig, config.format)
            .context("Failed to set up the render session")?;

        let size = window.inner_size();
        Ok(Self {
            surface,
            session,
            device,
            queue,
            config,
            size,
            camera,
            projection,
            camera_controller,
            mouse_pressed: false,
            window,
        })
    }

    /// Generates a fresh scene and starts accumulating from scratch.
    pub fn activate(&mut self) {
        if let Err(error) = self.session.on_activate(&self.device) {
            log::error!("Failed to activate render session: {}", error);
        }
    }

    pub fn deactivate(&mut self) {
        self.session.on_deactivate();
    }

    /// Resizes the surface and the projection. A changed aspect ratio restarts accumulation,
    /// the output buffers follow on the next frame.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            if self.projection.resize(new_size.width, new_size.height) {
                self.session.on_view_changed();
            }
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Handles input events for the camera and the scene.
    ///
    /// Returns whether the event was consumed.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        match event {
            // Roll a new scene
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Character(c),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if c.to_lowercase() == "r" => {
                self.activate();
                true
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent { logical_key: key, state, .. },
                ..
            } => self.camera_controller.process_keyboard(key, state),
            WindowEvent::MouseWheel { delta, .. } => {
                self.camera_controller.process_scroll(delta);
                true
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.mouse_pressed = *state == ElementState::Pressed;
                true
            }
            _ => false,
        }
    }

    /// Moves the camera. Any movement restarts accumulation.
    pub fn update(&mut self, dt: std::time::Duration) {
        if self.camera_controller.update_camera(&mut self.camera, dt) {
            self.session.on_view_changed();
        }
    }

    /// Renders one progressive frame.
    ///
    /// The output buffers are prepared before the surface texture is acquired. If that fails the
    /// frame is skipped and the previous image stays on screen.
    ///
    /// # Returns
    ///
    /// A `Result` that is `Ok` if the rendering was successful or skipped, or `Err` if there was an error with the surface.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if let Err(error) = self
            .session
            .prepare_frame(&self.device, self.config.width, self.config.height)
        {
            if error.is_frame_local() {
                log::warn!("Skipping frame: {}", error);
            } else {
                log::error!("Skipping frame: {}", error);
            }
            return Ok(());
        }

        // Get the current output texture from the surface
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        if let Err(error) = self
            .session
            .render_frame(&self.device, &self.queue, &self.camera, &self.projection, &view)
        {
            log::warn!("Skipping frame: {}", error);
            return Ok(());
        }

        output.present();
        Ok(())
    }
}
