//! `petalfall [--config FILE] [--headless FRAMES] [--log_filter FILTER]`
//!
//! Without `--headless` a window is opened and the effect runs on the GPU
//! until the window is closed. With `--headless FRAMES` the same frame loop
//! runs on the host reference device for a fixed number of 60 Hz frames and
//! prints a summary. `RUST_LOG` overrides `--log_filter`.

use std::process::ExitCode;
use std::time::Duration;

use petalfall::{Config, FrameLoop, NoiseField, ReferenceDevice, ResourceError, SpriteSet};

gflags::define! {
    /// JSON configuration file. Built-in defaults when not given.
    --config: &str = ""
}
gflags::define! {
    /// Run this many frames on the host reference device instead of opening a window.
    --headless: u64 = 0
}
gflags::define! {
    --log_filter: &str = "info"
}
gflags::define! {
    -h, --help = false
}

fn run_headless(config: &Config, frames: u64) -> Result<(), ResourceError> {
    let sprites = SpriteSet::from_config(&config.sprites)?;
    let device = ReferenceDevice::new(NoiseField::generate(config.noise_seed));
    let mut frame_loop = FrameLoop::new(device, config, sprites.len())?;

    let frame_time = Duration::from_secs_f64(1.0 / 60.0);
    let mut now = Duration::ZERO;
    frame_loop.run(
        || {
            let t = now;
            now += frame_time;
            t
        },
        Some(frames),
    );

    let state = frame_loop.state();
    let alive = frame_loop
        .device()
        .last_draw()
        .map(|draw| draw.records.iter().filter(|p| !p.is_expired()).count())
        .unwrap_or(0);
    println!(
        "{} frames, {:.2}s simulated, {} active slots, {} alive, {} dropped",
        state.frame, state.total_time, state.active_count, alive, state.dropped_frames
    );
    Ok(())
}

fn main() -> ExitCode {
    let positional = gflags::parse();
    if HELP.flag {
        gflags::print_help_and_exit(0);
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(LOG_FILTER.flag))
        .init();

    if let Some(arg) = positional.first() {
        eprintln!("unexpected argument '{arg}', see --help");
        return ExitCode::FAILURE;
    }

    let config = if CONFIG.is_present() {
        Config::from_file(CONFIG.flag)
    } else {
        Ok(Config::default())
    };
    let config = match config {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let result = if HEADLESS.is_present() {
        run_headless(&config, HEADLESS.flag)
    } else {
        SpriteSet::from_config(&config.sprites).and_then(|sprites| petalfall::window::run(config, sprites))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
