//! The per-frame driver.
//!
//! Each [`FrameLoop::tick`] runs one complete frame:
//!
//! 1. the [`FrameClock`] turns the timestamp into a clamped delta;
//! 2. the [`EmissionController`] grows the active range;
//! 3. the origin function places the emitter for this frame;
//! 4. the device simulates `read -> write` and draws `write`;
//! 5. on success the buffer roles swap.
//!
//! A frame the device refuses is logged and dropped: roles are not swapped,
//! so the next frame starts again from the last completed state.
//!
//! Cancellation goes through a [`CancelHandle`] and is only observed between
//! frames. A frame that has started always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::camera::Camera;
use crate::config::Config;
use crate::device::{BufferIndex, GraphicsDevice};
use crate::emitter::EmissionController;
use crate::error::{FrameError, ResourceError};
use crate::particle::initial_particles;
use crate::simulation::SimulationParams;
use crate::time::FrameClock;
use crate::uniforms::{RenderUniforms, SimUniforms};

/// Whether another frame should be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

/// Mutable per-run state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimState {
    /// Leading slots currently simulated and drawn.
    pub active_count: u32,
    /// Seconds of simulated time.
    pub total_time: f32,
    /// Buffer holding the latest completed state.
    pub read_index: BufferIndex,
    /// Completed frames.
    pub frame: u64,
    /// Frames the device refused.
    pub dropped_frames: u64,
}

impl SimState {
    #[inline]
    pub fn write_index(&self) -> BufferIndex {
        1 - self.read_index
    }
}

/// Cloneable flag that stops a [`FrameLoop`] at the next frame boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
}

type OriginFn = Box<dyn FnMut(f32) -> Vec2>;

pub struct FrameLoop<D: GraphicsDevice> {
    device: D,
    params: SimulationParams,
    emission: EmissionController,
    clock: FrameClock,
    camera: Camera,
    size: f32,
    sprite_count: u32,
    origin: OriginFn,
    state: SimState,
    phase: Phase,
    cancel: CancelHandle,
}

impl<D: GraphicsDevice> FrameLoop<D> {
    /// Validate `config`, allocate the particle buffers on `device` and return an idle loop.
    pub fn new(mut device: D, config: &Config, sprite_count: u32) -> Result<Self, ResourceError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.noise_seed.wrapping_add(1));
        let initial = initial_particles(config.capacity, config.min_age, config.max_age, &mut rng);
        device.allocate_particles(&initial)?;

        let path = config.origin;
        let camera = Camera::new(
            Vec2::ZERO,
            config.viewport.width as f32,
            config.viewport.height as f32,
        );

        log::info!(
            "Frame loop ready: {} slots, {} particles/s",
            config.capacity,
            config.birth_rate
        );

        Ok(Self {
            device,
            params: config.simulation_params(),
            emission: EmissionController::new(config.capacity, config.birth_rate),
            clock: FrameClock::new(),
            camera,
            size: config.size,
            sprite_count,
            origin: Box::new(move |t| path.at(t)),
            state: SimState::default(),
            phase: Phase::Idle,
            cancel: CancelHandle::default(),
        })
    }

    /// Replace the origin function. It receives the total simulated time in seconds.
    pub fn with_origin<F>(mut self, origin: F) -> Self
    where
        F: FnMut(f32) -> Vec2 + 'static,
    {
        self.origin = Box::new(origin);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run one frame at host time `now`.
    pub fn tick(&mut self, now: Duration) -> Tick {
        if self.cancel.is_cancelled() {
            return Tick::Stop;
        }
        if self.phase == Phase::Idle {
            log::debug!("Frame loop running");
            self.phase = Phase::Running;
        }

        let dt = self.clock.tick(now);
        self.state.total_time = self.clock.total();
        let was_saturated = self.emission.is_saturated();
        self.state.active_count = self.emission.advance(dt);
        if !was_saturated && self.emission.is_saturated() {
            log::debug!(
                "All {} slots active after {:.2}s",
                self.state.active_count,
                self.state.total_time
            );
        }
        self.params.origin = (self.origin)(self.state.total_time);

        let read = self.state.read_index;
        let write = self.state.write_index();
        let active = self.state.active_count;
        let sim = SimUniforms::new(&self.params, dt, self.state.total_time, active, self.state.frame);
        let view = RenderUniforms::new(self.camera.projection(), self.size, self.sprite_count);

        match self.run_frame(read, write, active, &sim, &view) {
            Ok(()) => {
                self.state.read_index = write;
                self.state.frame += 1;
                log::trace!(
                    "Frame {}: dt={:.4} active={} origin={:?}",
                    self.state.frame,
                    dt,
                    active,
                    self.params.origin
                );
            }
            Err(error) => {
                self.state.dropped_frames += 1;
                log::warn!("Dropped frame {}: {}", self.state.frame, error);
                if error.is_fatal() {
                    log::error!("Stopping frame loop after fatal error");
                    return Tick::Stop;
                }
            }
        }

        if self.cancel.is_cancelled() {
            Tick::Stop
        } else {
            Tick::Continue
        }
    }

    fn run_frame(
        &mut self,
        read: BufferIndex,
        write: BufferIndex,
        active: u32,
        sim: &SimUniforms,
        view: &RenderUniforms,
    ) -> Result<(), FrameError> {
        self.device.begin_frame()?;
        let recorded = self
            .device
            .simulate(read, write, active, sim)
            .and_then(|()| self.device.draw(write, active, view))
            .and_then(|()| self.device.end_frame());
        if recorded.is_err() {
            self.device.abort_frame();
        }
        recorded
    }

    /// Tick until stopped, cancelled or `max_frames` ticks have run. Returns the number of ticks.
    pub fn run<F>(&mut self, mut now: F, max_frames: Option<u64>) -> u64
    where
        F: FnMut() -> Duration,
    {
        let mut ticks = 0;
        while max_frames.map_or(true, |max| ticks < max) && !self.cancel.is_cancelled() {
            ticks += 1;
            if self.tick(now()) == Tick::Stop {
                break;
            }
        }
        log::info!(
            "Frame loop stopped after {} ticks ({} frames, {} dropped)",
            ticks,
            self.state.frame,
            self.state.dropped_frames
        );
        ticks
    }

    /// Make the next tick a zero-delta frame, e.g. after the window was hidden.
    pub fn restart_clock(&mut self) {
        self.clock.reset_previous();
    }

    /// Forward a new surface size to the device. The world extents do not change.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.device.resize(width, height);
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}
