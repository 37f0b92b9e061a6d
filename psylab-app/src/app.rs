use crate::keys::map_key;
use crate::task::Task;
use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use psylab_core::Key;
use psylab_render::SkiaRenderer;
use psylab_timing::{HighPrecisionTimer, Timer};
use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

pub const TARGET_FPS: u64 = 60;
const FRAME_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / TARGET_FPS);

pub struct App<T: Task> {
    task: T,
    fullscreen: bool,

    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    refresh_rate: Option<f64>,

    pacer: HighPrecisionTimer,
    frame_start: u64,

    error: Option<anyhow::Error>,
    should_exit: bool,
}

impl<T: Task> App<T> {
    pub fn new(task: T, fullscreen: bool) -> Self {
        let pacer = HighPrecisionTimer::new();
        let frame_start = pacer.now();
        Self {
            task,
            fullscreen,
            window: None,
            pixels: None,
            renderer: None,
            refresh_rate: None,
            pacer,
            frame_start,
            error: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        tracing::info!(
            task = self.task.title(),
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "starting"
        );
        event_loop.run_app(&mut self)?;

        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());
        self.refresh_rate = monitor
            .as_ref()
            .and_then(|m| m.refresh_rate_millihertz())
            .map(|rate| rate as f64 / 1000.0);

        let (w, h) = self.task.window_size();
        let mut attributes = Window::default_attributes()
            .with_title(format!("psylab: {}", self.task.title()))
            .with_resizable(false);
        attributes = if self.fullscreen {
            attributes.with_fullscreen(Some(Fullscreen::Borderless(monitor)))
        } else {
            attributes.with_inner_size(PhysicalSize::new(w, h))
        };

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        tracing::info!(
            width = size.width,
            height = size.height,
            scale_factor = window.scale_factor(),
            refresh_hz = self.refresh_rate,
            "display configured"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);

        let mut renderer = SkiaRenderer::with_system_font(size.width, size.height)
            .context("creating renderer")?;
        self.task.prepare(&mut renderer)?;
        self.renderer = Some(renderer);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        self.frame_start = self.pacer.now();
        Ok(())
    }

    /// Update, draw, present, then hold the frame to the target rate
    fn frame(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        self.task.update()?;
        if self.task.is_finished() {
            self.shutdown(event_loop, false);
            return Ok(());
        }

        let scene = self.task.scene();
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };
        let stats = renderer.render_frame(&scene, pixels.frame_mut())?;
        pixels.render()?;
        self.task.frame_presented();

        tracing::trace!(
            clear_us = stats.clear.as_micros() as u64,
            draw_us = stats.draw.as_micros() as u64,
            copy_us = stats.copy.as_micros() as u64,
            "frame"
        );

        self.pace();
        if let Some(window) = &self.window {
            window.request_redraw();
        }
        Ok(())
    }

    fn pace(&mut self) {
        let spent = self.pacer.elapsed(self.frame_start);
        if spent < FRAME_INTERVAL {
            self.pacer.sleep(FRAME_INTERVAL - spent);
        }
        let now = self.pacer.now();
        let frame_time = self.pacer.between(self.frame_start, now);
        self.pacer.record_frame(frame_time);
        self.frame_start = now;
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        if new_size.width == 0 || new_size.height == 0 {
            return Ok(());
        }
        if let Some(pixels) = &mut self.pixels {
            pixels.resize_surface(new_size.width, new_size.height)?;
            pixels.resize_buffer(new_size.width, new_size.height)?;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height)?;
        }
        tracing::debug!(width = new_size.width, height = new_size.height, "display resized");
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop, aborted: bool) {
        if self.should_exit {
            return;
        }
        if aborted {
            if let Err(e) = self.task.abort() {
                self.fail(e.context("flushing partial data"));
            }
        }
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }

        let stats = self.pacer.frame_stats();
        tracing::info!(
            frames = self.pacer.frame_count(),
            mean_frame_ms = stats.average_frame_time_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            fps = stats.effective_fps,
            "frame timing"
        );
        if let Some(renderer) = &self.renderer {
            let r = renderer.frame_stats();
            tracing::debug!(mean_render_ms = r.average_frame_time_ns / 1e6, "render timing");
        }

        self.should_exit = true;
        event_loop.exit();
    }

    fn fail(&mut self, e: anyhow::Error) {
        tracing::error!(error = %format!("{e:#}"), "stopping");
        if self.error.is_none() {
            self.error = Some(e);
        }
    }
}

impl<T: Task> ApplicationHandler for App<T> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                self.fail(e);
                self.should_exit = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let result = match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop, true);
                Ok(())
            }
            WindowEvent::RedrawRequested if !self.should_exit => self.frame(event_loop),
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                match map_key(event.physical_key) {
                    Key::Escape => self.shutdown(event_loop, true),
                    key => self.task.handle_key(key),
                }
                Ok(())
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => match self.window.as_ref().map(|w| w.inner_size()) {
                Some(size) => self.handle_resize(size),
                None => Ok(()),
            },
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.fail(e);
            self.shutdown(event_loop, true);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
