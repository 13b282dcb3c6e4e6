//! Integration tests for the frame loop.
//!
//! These drive a [`FrameLoop`] over the host [`ReferenceDevice`], which runs
//! the same kernel as the GPU and records every draw.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use petalfall::{
    Config, ConfigError, FrameError, FrameLoop, GraphicsDevice, NoiseField, OriginPath,
    ReferenceDevice, ResourceError, Stage, Tick, Vec2,
};

const ORIGIN: Vec2 = Vec2::new(0.0, 300.0);

fn config(capacity: u32, birth_rate: f32) -> Config {
    Config {
        capacity,
        birth_rate,
        origin: OriginPath::Fixed { position: ORIGIN },
        ..Default::default()
    }
}

fn new_loop(config: &Config) -> FrameLoop<ReferenceDevice> {
    let device = ReferenceDevice::new(NoiseField::generate(config.noise_seed));
    FrameLoop::new(device, config, 4).unwrap()
}

/// Host time of the `n`th frame at a steady 16 ms cadence.
fn frame_time(n: u64) -> Duration {
    Duration::from_millis(16 * n)
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn test_invalid_config_is_rejected_before_allocation() {
    let bad = Config {
        min_age: 2.0,
        max_age: 1.0,
        ..Default::default()
    };
    let device = ReferenceDevice::new(NoiseField::generate(1));
    let err = FrameLoop::new(device, &bad, 4).err().unwrap();
    assert!(matches!(err, ResourceError::Config(ConfigError::AgeRange { .. })));
}

#[test]
fn test_buffers_start_identical_and_pre_dead() {
    let config = config(20, 100.0);
    let frame_loop = new_loop(&config);

    let a = frame_loop.device().buffer(0).unwrap();
    let b = frame_loop.device().buffer(1).unwrap();
    assert_eq!(a.len(), 20);
    assert_eq!(a, b);
    for p in a {
        assert!(p.is_expired());
        assert!(p.life >= config.min_age && p.life <= config.max_age);
        assert_eq!(p.position, Vec2::ZERO);
        assert_eq!(p.velocity, Vec2::ZERO);
    }
    assert!(!frame_loop.is_running());
}

// ============================================================================
// Buffer roles
// ============================================================================

#[test]
fn test_read_index_alternates_with_completed_frames() {
    let mut frame_loop = new_loop(&config(50, 600.0));

    for n in 0..9u64 {
        assert_eq!(frame_loop.state().read_index as u64, n % 2);
        assert_eq!(frame_loop.tick(frame_time(n)), Tick::Continue);
    }
    assert_eq!(frame_loop.state().frame, 9);
    assert_eq!(frame_loop.state().read_index, 1);
    assert!(frame_loop.is_running());
}

#[test]
fn test_draw_reads_the_buffer_just_written() {
    let mut frame_loop = new_loop(&config(50, 600.0));

    for n in 0..6 {
        let write = frame_loop.state().write_index();
        frame_loop.tick(frame_time(n));

        let device = frame_loop.device();
        let draw = device.last_draw().unwrap();
        assert_eq!(draw.buffer, write);
        // After the swap the drawn buffer holds the latest state.
        assert_eq!(frame_loop.state().read_index, write);

        let written = device.buffer(write).unwrap();
        assert_eq!(draw.records.as_slice(), &written[..draw.records.len()]);
    }
}

// ============================================================================
// Emission
// ============================================================================

#[test]
fn test_first_frame_emits_nothing() {
    let mut frame_loop = new_loop(&config(50, 600.0));
    frame_loop.tick(frame_time(0));

    assert_eq!(frame_loop.state().active_count, 0);
    let draw = frame_loop.device().last_draw().unwrap();
    assert_eq!(draw.instances, 0);
    assert!(draw.records.is_empty());
}

#[test]
fn test_active_count_grows_monotonically_to_capacity() {
    let mut frame_loop = new_loop(&config(50, 600.0));
    let mut previous = 0;

    for n in 0..20 {
        frame_loop.tick(frame_time(n));
        let active = frame_loop.state().active_count;
        assert!(active >= previous);
        assert!(active <= 50);
        assert_eq!(frame_loop.device().last_draw().unwrap().instances, active);
        previous = active;
    }
    assert_eq!(previous, 50);
}

#[test]
fn test_long_pause_freezes_emission() {
    let mut frame_loop = new_loop(&config(500, 600.0));
    frame_loop.tick(frame_time(0));
    frame_loop.tick(frame_time(1));
    let active = frame_loop.state().active_count;
    let total = frame_loop.state().total_time;
    assert!(active > 0);

    // A 2 second gap is clamped to a zero delta.
    frame_loop.tick(Duration::from_secs(2));
    assert_eq!(frame_loop.state().active_count, active);
    assert_eq!(frame_loop.state().total_time, total);
}

#[test]
fn test_restart_clock_gives_zero_delta() {
    let mut frame_loop = new_loop(&config(500, 600.0));
    frame_loop.tick(frame_time(0));
    frame_loop.tick(frame_time(1));
    let active = frame_loop.state().active_count;

    frame_loop.restart_clock();
    frame_loop.tick(frame_time(2));
    assert_eq!(frame_loop.clock().delta(), 0.0);
    assert_eq!(frame_loop.state().active_count, active);
}

// ============================================================================
// Rebirth
// ============================================================================

#[test]
fn test_new_particles_are_born_at_the_origin() {
    let config = config(50, 600.0);
    let mut frame_loop = new_loop(&config);
    frame_loop.tick(frame_time(0));
    frame_loop.tick(frame_time(1));

    let draw = frame_loop.device().last_draw().unwrap();
    assert!(!draw.records.is_empty());
    for p in &draw.records {
        assert_eq!(p.age, 0.0);
        assert_eq!(p.position, ORIGIN);
        assert!(p.life >= config.min_age && p.life <= config.max_age);
        assert!(p.velocity.length() <= config.max_speed + 1e-4);
    }
}

#[test]
fn test_each_slot_keeps_its_sprite_layer() {
    let mut frame_loop = new_loop(&config(50, 600.0));
    for n in 0..4 {
        frame_loop.tick(frame_time(n));
    }

    let draw = frame_loop.device().last_draw().unwrap();
    assert_eq!(draw.uniforms.sprite_count, 4);
    assert_eq!(draw.layers.len(), draw.records.len());
    for (slot, layer) in draw.layers.iter().enumerate() {
        assert_eq!(*layer, slot as u32 % 4);
    }
}

#[test]
fn test_particles_fall_after_birth() {
    let mut frame_loop = new_loop(&config(10, 1000.0));
    frame_loop.tick(frame_time(0));
    frame_loop.tick(frame_time(1));
    let born = frame_loop.device().last_draw().unwrap().records.clone();

    frame_loop.tick(frame_time(2));
    let moved = &frame_loop.device().last_draw().unwrap().records;
    for (before, after) in born.iter().zip(moved) {
        assert!((after.age - 0.016).abs() < 1e-5);
        assert_eq!(after.life, before.life);
        // Gravity pulls the velocity down; the position used the old velocity.
        assert!(after.velocity.y < before.velocity.y);
        let expected = before.position + before.velocity * 0.016;
        assert!((after.position - expected).length() < 1e-3);
    }
}

#[test]
fn test_origin_function_receives_total_time() {
    let seen = Rc::new(Cell::new(-1.0f32));
    let recorder = seen.clone();
    let mut frame_loop = new_loop(&config(10, 100.0)).with_origin(move |t| {
        recorder.set(t);
        Vec2::new(t, 0.0)
    });

    for n in 0..4 {
        frame_loop.tick(frame_time(n));
    }
    let total = frame_loop.state().total_time;
    assert!((total - 0.048).abs() < 1e-5);
    assert_eq!(seen.get(), total);
    assert_eq!(frame_loop.params().origin, Vec2::new(total, 0.0));
}

// ============================================================================
// Failures and cancellation
// ============================================================================

#[test]
fn test_dropped_frame_does_not_swap() {
    let mut frame_loop = new_loop(&config(50, 600.0));
    frame_loop.tick(frame_time(0));
    frame_loop.tick(frame_time(1));
    let read = frame_loop.state().read_index;
    let draws = frame_loop.device().draws().len();

    frame_loop.device_mut().fail_next(Stage::Draw);
    assert_eq!(frame_loop.tick(frame_time(2)), Tick::Continue);

    let state = frame_loop.state();
    assert_eq!(state.read_index, read);
    assert_eq!(state.frame, 2);
    assert_eq!(state.dropped_frames, 1);
    assert_eq!(frame_loop.device().draws().len(), draws);

    // The loop carries on from the last completed state.
    frame_loop.tick(frame_time(3));
    assert_eq!(frame_loop.state().read_index, 1 - read);
    assert_eq!(frame_loop.state().frame, 3);
}

#[test]
fn test_failure_at_any_stage_drops_the_frame() {
    for stage in [Stage::Begin, Stage::Simulate, Stage::Draw, Stage::End] {
        let mut frame_loop = new_loop(&config(10, 600.0));
        frame_loop.tick(frame_time(0));

        frame_loop.device_mut().fail_next(stage);
        frame_loop.tick(frame_time(1));
        assert_eq!(frame_loop.state().dropped_frames, 1, "{stage:?}");
        assert_eq!(frame_loop.state().read_index, 1, "{stage:?}");

        // Next frame records normally.
        frame_loop.tick(frame_time(2));
        assert_eq!(frame_loop.state().read_index, 0, "{stage:?}");
        assert_eq!(frame_loop.device().frames_presented(), 2, "{stage:?}");
    }
}

#[test]
fn test_out_of_memory_stops_the_loop() {
    let mut frame_loop = new_loop(&config(10, 600.0));
    frame_loop.tick(frame_time(0));
    let read = frame_loop.state().read_index;

    frame_loop
        .device_mut()
        .fail_next_with(Stage::Begin, FrameError::Surface(wgpu::SurfaceError::OutOfMemory));
    assert_eq!(frame_loop.tick(frame_time(1)), Tick::Stop);

    let state = frame_loop.state();
    assert_eq!(state.read_index, read);
    assert_eq!(state.frame, 1);
    assert_eq!(state.dropped_frames, 1);
    assert_eq!(frame_loop.device().frames_presented(), 1);
}

#[test]
fn test_lost_surface_drops_one_frame() {
    let mut frame_loop = new_loop(&config(10, 600.0));
    frame_loop.tick(frame_time(0));

    frame_loop
        .device_mut()
        .fail_next_with(Stage::Begin, FrameError::Surface(wgpu::SurfaceError::Lost));
    assert_eq!(frame_loop.tick(frame_time(1)), Tick::Continue);
    assert_eq!(frame_loop.state().dropped_frames, 1);

    assert_eq!(frame_loop.tick(frame_time(2)), Tick::Continue);
    assert_eq!(frame_loop.state().frame, 2);
}

#[test]
fn test_cancel_stops_before_next_frame() {
    let mut frame_loop = new_loop(&config(10, 600.0));
    let handle = frame_loop.cancel_handle();

    frame_loop.tick(frame_time(0));
    handle.cancel();
    assert_eq!(frame_loop.tick(frame_time(1)), Tick::Stop);
    assert_eq!(frame_loop.device().frames_presented(), 1);
    assert_eq!(frame_loop.state().frame, 1);
}

#[test]
fn test_cancel_during_frame_lets_it_finish() {
    let frame_loop = new_loop(&config(10, 600.0));
    let handle = frame_loop.cancel_handle();
    let mut frame_loop = frame_loop.with_origin(move |t| {
        if t > 0.05 {
            handle.cancel();
        }
        ORIGIN
    });

    let mut n = 0;
    let ticks = frame_loop.run(
        || {
            let t = frame_time(n);
            n += 1;
            t
        },
        Some(100),
    );

    // Total time passes 0.05 s on the fifth tick; that frame still completes.
    assert_eq!(ticks, 5);
    assert_eq!(frame_loop.state().frame, 5);
    assert_eq!(frame_loop.device().frames_presented(), 5);
}

#[test]
fn test_run_respects_frame_budget() {
    let mut frame_loop = new_loop(&config(10, 600.0));
    let mut n = 0;
    let ticks = frame_loop.run(
        || {
            n += 1;
            frame_time(n)
        },
        Some(12),
    );
    assert_eq!(ticks, 12);
    assert_eq!(frame_loop.state().frame, 12);
}

#[test]
fn test_resize_reaches_device() {
    let mut frame_loop = new_loop(&config(10, 600.0));
    frame_loop.resize(1024, 768);
    assert_eq!(frame_loop.device().size(), (1024, 768));
    // World extents are unchanged.
    assert_eq!(frame_loop.camera().width, 800.0);
}

#[test]
fn test_reference_device_is_a_graphics_device() {
    fn assert_device<D: GraphicsDevice>(_: &D) {}
    let device = ReferenceDevice::new(NoiseField::generate(0));
    assert_device(&device);
}
