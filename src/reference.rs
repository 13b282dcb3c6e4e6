//! A [`GraphicsDevice`] that runs the kernel on the host.
//!
//! The reference device keeps both particle buffers in memory, executes
//! [`simulation::simulate`] for every dispatch and records each draw instead
//! of rasterising it. It backs the headless mode of the binary and the frame
//! loop tests, which can also inject failures at any stage.

use crate::device::{check_roles, BufferIndex, GraphicsDevice};
use crate::error::{FrameError, ResourceError};
use crate::noise::NoiseField;
use crate::particle::ParticleRecord;
use crate::simulation;
use crate::textures::sprite_layer;
use crate::uniforms::{RenderUniforms, SimUniforms};

/// Frame stage at which a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Begin,
    Simulate,
    Draw,
    End,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Begin => "begin",
            Stage::Simulate => "simulation",
            Stage::Draw => "render",
            Stage::End => "present",
        }
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Buffer the instances were read from.
    pub buffer: BufferIndex,
    pub instances: u32,
    pub uniforms: RenderUniforms,
    /// The drawn records, copied at draw time.
    pub records: Vec<ParticleRecord>,
    /// Sprite layer sampled by each drawn record.
    pub layers: Vec<u32>,
}

/// Host implementation of [`GraphicsDevice`].
#[derive(Debug)]
pub struct ReferenceDevice {
    noise: NoiseField,
    buffers: Option<[Vec<ParticleRecord>; 2]>,
    in_frame: bool,
    /// Draws of the frame being recorded.
    pending: Vec<DrawCall>,
    draws: Vec<DrawCall>,
    frames_presented: u64,
    fail_at: Option<(Stage, FrameError)>,
    size: (u32, u32),
}

impl ReferenceDevice {
    pub fn new(noise: NoiseField) -> Self {
        Self {
            noise,
            buffers: None,
            in_frame: false,
            pending: Vec::new(),
            draws: Vec::new(),
            frames_presented: 0,
            fail_at: None,
            size: (0, 0),
        }
    }

    /// Make the next call of `stage` fail once with [`FrameError::Rejected`].
    pub fn fail_next(&mut self, stage: Stage) {
        let error = FrameError::Rejected {
            stage: stage.label(),
            reason: "injected failure".to_string(),
        };
        self.fail_next_with(stage, error);
    }

    /// Make the next call of `stage` fail once with `error`.
    pub fn fail_next_with(&mut self, stage: Stage, error: FrameError) {
        self.fail_at = Some((stage, error));
    }

    /// Contents of particle buffer `index`.
    pub fn buffer(&self, index: BufferIndex) -> Option<&[ParticleRecord]> {
        self.buffers.as_ref().map(|b| b[index].as_slice())
    }

    /// Draws of every presented frame, oldest first.
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn last_draw(&self) -> Option<&DrawCall> {
        self.draws.last()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Last size passed to [`GraphicsDevice::resize`].
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn injected(&mut self, stage: Stage) -> Result<(), FrameError> {
        match self.fail_at.take() {
            Some((at, error)) if at == stage => Err(error),
            pending => {
                self.fail_at = pending;
                Ok(())
            }
        }
    }

    fn require_frame(&self, stage: &'static str) -> Result<(), FrameError> {
        if self.in_frame {
            Ok(())
        } else {
            Err(FrameError::OutOfFrame(stage))
        }
    }
}

impl GraphicsDevice for ReferenceDevice {
    fn allocate_particles(&mut self, initial: &[ParticleRecord]) -> Result<(), ResourceError> {
        if self.buffers.is_some() {
            return Err(ResourceError::Buffers("already allocated"));
        }
        self.buffers = Some([initial.to_vec(), initial.to_vec()]);
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        self.injected(Stage::Begin)?;
        self.in_frame = true;
        self.pending.clear();
        Ok(())
    }

    fn simulate(
        &mut self,
        read: BufferIndex,
        write: BufferIndex,
        active_count: u32,
        uniforms: &SimUniforms,
    ) -> Result<(), FrameError> {
        self.require_frame("simulation")?;
        check_roles(read, write)?;
        self.injected(Stage::Simulate)?;

        let buffers = self
            .buffers
            .as_mut()
            .ok_or(FrameError::OutOfFrame("simulation before allocation"))?;
        let [a, b] = buffers;
        let (src, dst) = if read == 0 { (&*a, b) } else { (&*b, a) };

        let mut u = *uniforms;
        u.active_count = active_count;
        simulation::simulate(src, dst, &u, &self.noise);
        Ok(())
    }

    fn draw(
        &mut self,
        buffer: BufferIndex,
        active_count: u32,
        uniforms: &RenderUniforms,
    ) -> Result<(), FrameError> {
        self.require_frame("render")?;
        self.injected(Stage::Draw)?;

        let records = self
            .buffers
            .as_ref()
            .and_then(|b| b.get(buffer))
            .ok_or(FrameError::OutOfFrame("render before allocation"))?;
        let active = (active_count as usize).min(records.len());
        let layers = (0..active as u32)
            .map(|slot| sprite_layer(slot, uniforms.sprite_count))
            .collect();
        self.pending.push(DrawCall {
            buffer,
            instances: active_count,
            uniforms: *uniforms,
            records: records[..active].to_vec(),
            layers,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), FrameError> {
        self.require_frame("present")?;
        self.injected(Stage::End)?;
        self.in_frame = false;
        self.draws.append(&mut self.pending);
        self.frames_presented += 1;
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.in_frame = false;
        self.pending.clear();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec2};

    use super::*;
    use crate::simulation::SimulationParams;

    fn device_with(initial: &[ParticleRecord]) -> ReferenceDevice {
        let mut device = ReferenceDevice::new(NoiseField::generate(7));
        device.allocate_particles(initial).unwrap();
        device
    }

    #[test]
    fn test_double_allocation_fails() {
        let mut device = device_with(&[ParticleRecord::default()]);
        assert!(device.allocate_particles(&[]).is_err());
    }

    #[test]
    fn test_simulate_writes_only_the_write_buffer() {
        let initial = vec![
            ParticleRecord {
                position: Vec2::ZERO,
                age: 0.0,
                life: 10.0,
                velocity: Vec2::new(1.0, 0.0),
            };
            4
        ];
        let mut device = device_with(&initial);
        let u = SimUniforms::new(&SimulationParams::default(), 0.5, 0.5, 2, 0);

        device.begin_frame().unwrap();
        device.simulate(0, 1, 2, &u).unwrap();

        assert_eq!(device.buffer(0).unwrap(), initial.as_slice());
        let written = device.buffer(1).unwrap();
        assert_eq!(written[0].age, 0.5);
        assert_eq!(written[1].position, Vec2::new(0.5, 0.0));
        // Inactive slots are untouched.
        assert_eq!(written[2], initial[2]);
    }

    #[test]
    fn test_stages_outside_frame_are_rejected() {
        let mut device = device_with(&[ParticleRecord::default()]);
        let u = SimUniforms::default();
        assert!(matches!(device.simulate(0, 1, 1, &u), Err(FrameError::OutOfFrame(_))));
        assert!(matches!(device.end_frame(), Err(FrameError::OutOfFrame(_))));
    }

    #[test]
    fn test_same_buffer_roles_rejected() {
        let mut device = device_with(&[ParticleRecord::default()]);
        device.begin_frame().unwrap();
        let err = device.simulate(1, 1, 1, &SimUniforms::default()).unwrap_err();
        assert!(matches!(err, FrameError::Rejected { .. }));
    }

    #[test]
    fn test_draws_are_committed_on_end_frame() {
        let mut device = device_with(&[ParticleRecord::default(); 3]);
        let view = RenderUniforms::new(Mat4::IDENTITY, 35.0, 4);

        device.begin_frame().unwrap();
        device.draw(1, 2, &view).unwrap();
        assert!(device.draws().is_empty());
        device.end_frame().unwrap();

        let draw = device.last_draw().unwrap();
        assert_eq!(draw.buffer, 1);
        assert_eq!(draw.instances, 2);
        assert_eq!(draw.records.len(), 2);
        assert_eq!(draw.layers, vec![0, 1]);
        assert_eq!(device.frames_presented(), 1);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut device = device_with(&[ParticleRecord::default()]);
        device.fail_next(Stage::Draw);

        device.begin_frame().unwrap();
        assert!(device.draw(0, 1, &RenderUniforms::new(Mat4::IDENTITY, 1.0, 1)).is_err());
        device.abort_frame();

        device.begin_frame().unwrap();
        device.draw(0, 1, &RenderUniforms::new(Mat4::IDENTITY, 1.0, 1)).unwrap();
        device.end_frame().unwrap();
        assert_eq!(device.draws().len(), 1);
    }

    #[test]
    fn test_injected_error_waits_for_its_stage() {
        let mut device = device_with(&[ParticleRecord::default()]);
        device.fail_next_with(Stage::End, FrameError::Surface(wgpu::SurfaceError::OutOfMemory));

        device.begin_frame().unwrap();
        device.draw(0, 1, &RenderUniforms::new(Mat4::IDENTITY, 1.0, 1)).unwrap();
        let err = device.end_frame().unwrap_err();
        assert!(err.is_fatal());
        device.abort_frame();
        assert_eq!(device.frames_presented(), 0);
    }
}
