//! Windowed host: a `winit` application driving a [`FrameLoop`] on a [`WgpuDevice`].
//!
//! The window is created on `resumed`. Every `RedrawRequested` runs one tick
//! and requests the next redraw unless the loop asked to stop.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::Config;
use crate::error::ResourceError;
use crate::frame_loop::{FrameLoop, Tick};
use crate::gpu::WgpuDevice;
use crate::noise::NoiseField;
use crate::textures::SpriteSet;

/// How often the FPS estimate is written to the window title, in ticks.
const TITLE_REFRESH_TICKS: u64 = 30;

struct App {
    config: Config,
    sprites: SpriteSet,
    start: Instant,
    window: Option<Arc<Window>>,
    frame_loop: Option<FrameLoop<WgpuDevice>>,
    /// Setup failure raised inside the event loop, reported once it exits.
    error: Option<ResourceError>,
}

impl App {
    fn new(config: Config, sprites: SpriteSet) -> Self {
        Self {
            config,
            sprites,
            start: Instant::now(),
            window: None,
            frame_loop: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ResourceError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.viewport.width,
                self.config.viewport.height,
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let noise = NoiseField::generate(self.config.noise_seed);
        let device = pollster::block_on(WgpuDevice::new(
            window.clone(),
            &self.config,
            &self.sprites,
            &noise,
        ))?;
        let frame_loop = FrameLoop::new(device, &self.config, self.sprites.len())?;

        self.start = Instant::now();
        self.window = Some(window);
        self.frame_loop = Some(frame_loop);
        Ok(())
    }

    fn update_title(&self, frame_loop: &FrameLoop<WgpuDevice>) {
        let clock = frame_loop.clock();
        if clock.ticks() % TITLE_REFRESH_TICKS != 0 {
            return;
        }
        if let Some(window) = &self.window {
            window.set_title(&format!(
                "{} - {:.0} fps - {} particles",
                self.config.title,
                clock.fps(),
                frame_loop.state().active_count
            ));
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(error) = self.init(event_loop) {
                log::error!("Startup failed: {error}");
                self.error = Some(error);
                event_loop.exit();
                return;
            }
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(frame_loop) = &self.frame_loop {
                    frame_loop.cancel_handle().cancel();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.resize(physical_size.width, physical_size.height);
                }
            }
            WindowEvent::Occluded(false) => {
                if let Some(frame_loop) = &mut self.frame_loop {
                    frame_loop.restart_clock();
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(mut frame_loop) = self.frame_loop.take() else {
                    return;
                };
                let decision = frame_loop.tick(self.start.elapsed());
                self.update_title(&frame_loop);
                self.frame_loop = Some(frame_loop);

                match decision {
                    Tick::Continue => {
                        if let Some(window) = &self.window {
                            window.request_redraw();
                        }
                    }
                    Tick::Stop => event_loop.exit(),
                }
            }
            _ => {}
        }
    }
}

/// Open a window and run the effect until it is closed.
pub fn run(config: Config, sprites: SpriteSet) -> Result<(), ResourceError> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, sprites);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
