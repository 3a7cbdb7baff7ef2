//! Example: drive the scope from a synthetic audio stream.
//!
//! A sine source stands in for the audio callback and publishes blocks at
//! real-time pace while the render thread draws them. The last displayed
//! frame is saved as a PNG.
//!
//! Run with:
//!     RUST_LOG=debug cargo run --example scope_synthetic -- [output.png]

use anyhow::Context;
use phobz_scope::{EncodingDescriptor, ScopeConfig, ScopeStatus, SineSource, WaveformScope};
use std::thread;
use std::time::{Duration, Instant};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("scope_synthetic.png"));

    println!("Phobz Scope - Synthetic Stream Example");
    println!("======================================\n");

    let config = ScopeConfig {
        width: 800,
        height: 300,
        line_width: 1.5,
        ..ScopeConfig::default()
    };
    println!("Surface: {}x{}", config.width, config.height);

    let mut scope = WaveformScope::start_wgpu(config).context("failed to start scope")?;

    let sink = scope.sink();
    let audio = thread::Builder::new()
        .name("audio".to_string())
        .spawn(move || {
            let mut source = SineSource::new(EncodingDescriptor::stereo(48000), 110.0, 0.8, 480);
            sink.set_encoding(source.encoding());
            let interval = source.block_interval();
            let started = Instant::now();
            let mut blocks = 0u32;
            while started.elapsed() < Duration::from_secs(2) {
                sink.process_samples(source.next_samples());
                blocks += 1;
                thread::sleep(interval);
            }
            blocks
        })
        .context("failed to spawn audio thread")?;

    // Simulate a layout change halfway through.
    thread::sleep(Duration::from_secs(1));
    scope.resize(600, 200)?;

    let blocks = audio
        .join()
        .map_err(|_| anyhow::anyhow!("audio thread panicked"))?;
    println!("Audio thread delivered {} blocks", blocks);
    println!(
        "Stage: {} published, {} rejected",
        scope.stage().published_blocks(),
        scope.stage().rejected_blocks()
    );

    thread::sleep(Duration::from_millis(100));
    if let ScopeStatus::Unavailable(reason) = scope.status() {
        anyhow::bail!("visualization unavailable: {}", reason);
    }

    let frame = scope
        .front_buffer()
        .and_then(|front| front.latest())
        .context("no frame was displayed")?;
    frame
        .save_png(&output)
        .with_context(|| format!("failed to write {}", output))?;
    println!(
        "Saved {}x{} frame (device generation {}) to {}",
        frame.width, frame.height, frame.generation, output
    );

    scope.dispose();
    Ok(())
}
