//! Headless driver for the stellar scene core.
//!
//! Loads a TOML scene, runs a number of frames while turning and moving the
//! observer, and prints the transitions of every frame. Renderables are
//! handed to a stand-in render thread through the frame handoff.
//!
//! ```text
//! RUST_LOG=stellar_core=debug stellar_probe --scene solar.toml --frames 20 --yaw-step 5
//! ```

mod scene_file;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use stellar_core::scene::lookup_table;
use stellar_core::{AnchorId, DeferredTask, FrameHandoff, NullPresentation, SphericalSurface, StellarWorld};

use scene_file::SceneFile;

/// Runs the scene core over a scene file and reports what becomes visible.
#[derive(Parser, Debug)]
#[command(name = "stellar_probe")]
#[command(about = "Runs the stellar scene core headless over a TOML scene")]
struct Args {
	/// Path to the scene TOML file.
	#[arg(short, long)]
	scene: PathBuf,

	/// Number of frames to run.
	#[arg(short, long, default_value_t = 10)]
	frames: u32,

	/// Observer yaw per frame, in degrees.
	#[arg(long, default_value_t = 0.0)]
	yaw_step: f64,

	/// Observer motion along the camera vector per frame, in km.
	#[arg(long, default_value_t = 0.0)]
	dolly: f64,

	/// Simulation time advanced per frame.
	#[arg(long, default_value_t = 1.0)]
	dt: f64,
}

fn main() -> Result<()> {
	init_logging();
	let args = Args::parse();

	let scene = SceneFile::load(&args.scene)?;
	let mut world = scene
		.build()
		.with_context(|| format!("Building scene from {}", args.scene.display()))?;
	tracing::info!(
		anchors = world.arena().len(),
		scene = %args.scene.display(),
		"scene loaded"
	);

	let config = world.config();
	let (mode, midplane, samples) = (
		config.depth_scaling(),
		config.midplane,
		config.lookup_table_samples,
	);
	let mut depth_table = DeferredTask::spawn(move || lookup_table(mode, midplane, 100.0 * midplane, samples));

	let (handoff, receiver) = FrameHandoff::new(1);
	let render = std::thread::spawn(move || {
		let mut frames = 0u64;
		let mut renderables = 0usize;
		while let Some(frame) = receiver.recv_timeout(Duration::from_secs(5)) {
			frames += 1;
			renderables += frame.renderables.len();
		}
		(frames, renderables)
	});

	for frame in 0..args.frames {
		if frame > 0 {
			world.yaw_observer(args.yaw_step.to_radians());
			world.dolly_observer(args.dolly);
		}
		let t = frame as f64 * args.dt;
		let output = world.update(t, &mut NullPresentation, Some(&SphericalSurface));

		if let Some(table) = depth_table.poll() {
			println!(
				"Depth table ready: {} mode, {} samples, far value {:.1}",
				table.mode.name(),
				table.values.len(),
				table.values.last().copied().unwrap_or_default()
			);
		}

		let summary = &output.transitions;
		println!(
			"frame {:>4}  t={:<8} candidates={:<5} visible={:<5} resolved={:<4}",
			output.update_id,
			t,
			output.stats.candidates,
			output.stats.visible,
			output.stats.resolved
		);
		print_group(&world, "+visible ", &summary.newly_visible);
		print_group(&world, "+resolved", &summary.newly_resolved);
		print_group(&world, "-point   ", &summary.newly_point);
		print_group(&world, "-hidden  ", &summary.newly_hidden);

		handoff.publish(output);
	}
	drop(handoff);
	depth_table.cancel();

	let (frames, renderables) = render
		.join()
		.map_err(|_| anyhow::anyhow!("render thread panicked"))?;

	let metrics = world.metrics();
	println!("\nRan {} frames", world.update_id());
	println!("  render thread consumed {} frames, {} renderables", frames, renderables);
	println!("  visible at end: {}", world.visible().len());
	println!("  resolved at end: {}", world.resolved().len());
	if metrics.total_frames > 0 {
		println!(
			"  {:.1} us/frame, {:.1} us/traversal",
			metrics.avg_frame_timing_us(),
			metrics.avg_traversal_timing_us()
		);
	}
	Ok(())
}

fn print_group(world: &StellarWorld, label: &str, anchors: &[AnchorId]) {
	if anchors.is_empty() {
		return;
	}
	let names: Vec<&str> = anchors
		.iter()
		.map(|id| world.anchor(*id).map(|a| a.name()).unwrap_or("?"))
		.collect();
	println!("  {} {}", label, names.join(", "));
}

fn init_logging() {
	use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info,stellar_core=warn".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();
}
