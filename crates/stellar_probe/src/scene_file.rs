//! TOML scene description for the probe.
//!
//! ```toml
//! units = "au"                 # km | au | ly | pc, for positions and orbit radii
//!
//! [config]                     # stellar_core::SceneConfig, every field optional
//! lowest_app_magnitude = 6.5
//!
//! [observer]
//! position = [0.0, -3.0, 0.5]
//! pitch_deg = 80.0             # camera starts looking down -Z, pitched about +X
//! fov_deg = 45.0
//!
//! [[system]]
//! name = "Sol"
//! primary = "Sun"
//!
//! [[anchor]]
//! name = "Sun"
//! parent = "Sol"
//! kind = ["emissive"]
//! luminosity_solar = 1.0
//! radius_km = 696000.0
//!
//! [[anchor]]
//! name = "Earth"
//! parent = "Sol"
//! kind = ["reflective"]
//! orbit = { radius = 1.0, period = 365.25 }
//! radius_km = 6371.0
//! albedo = 0.3
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use glam::{DQuat, DVec3};
use serde::Deserialize;
use stellar_core::constants::{KM_PER_AU, KM_PER_LIGHT_YEAR, KM_PER_PARSEC, SOLAR_LUMINOSITY};
use stellar_core::{
	AnchorId, AnchorKind, CircularOrbit, FixedOrbit, FixedRotation, FrameRecord, Frustum, Orbit,
	Rotation, SceneConfig, StellarWorld, UniformRotation,
};

/// Root of a scene file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneFile {
	#[serde(default = "default_units")]
	pub units: String,
	#[serde(default)]
	pub config: SceneConfig,
	#[serde(default)]
	pub observer: ObserverSpec,
	#[serde(default)]
	pub system: Vec<ContainerSpec>,
	#[serde(default)]
	pub octree: Vec<ContainerSpec>,
	#[serde(default)]
	pub anchor: Vec<AnchorSpec>,
}

fn default_units() -> String {
	String::from("km")
}

/// Initial observer pose.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObserverSpec {
	pub position: [f64; 3],
	pub yaw_deg: f64,
	pub pitch_deg: f64,
	pub fov_deg: f64,
	pub aspect: f64,
	/// Viewport height in pixels, for the pixel size.
	pub viewport_height: f64,
}

impl Default for ObserverSpec {
	fn default() -> Self {
		Self {
			position: [0.0; 3],
			yaw_deg: 0.0,
			pitch_deg: 0.0,
			fov_deg: 45.0,
			aspect: 16.0 / 9.0,
			viewport_height: 1080.0,
		}
	}
}

/// A system or octree container.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
	pub name: String,
	/// Defaults to the universe.
	pub parent: Option<String>,
	#[serde(default)]
	pub position: [f64; 3],
	/// Systems only.
	pub primary: Option<String>,
}

/// Circular orbit parameters, radius in file units.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrbitSpec {
	pub radius: f64,
	pub period: f64,
	#[serde(default)]
	pub inclination_deg: f64,
	#[serde(default)]
	pub node_deg: f64,
	#[serde(default)]
	pub phase_deg: f64,
}

/// Frame record, angles in degrees.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameSpecFile {
	#[serde(default)]
	pub ra_deg: f64,
	#[serde(default)]
	pub dec_deg: f64,
	#[serde(default)]
	pub node_deg: f64,
	pub parent: String,
}

impl FrameSpecFile {
	fn record(&self) -> FrameRecord {
		FrameRecord {
			ra: self.ra_deg.to_radians(),
			dec: self.dec_deg.to_radians(),
			longitude_at_node: self.node_deg.to_radians(),
			parent_frame_name: self.parent.clone(),
		}
	}
}

/// A star, planet or other body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorSpec {
	pub name: String,
	#[serde(default)]
	pub aliases: Vec<String>,
	pub parent: Option<String>,
	pub kind: Vec<String>,
	#[serde(default)]
	pub position: [f64; 3],
	pub orbit: Option<OrbitSpec>,
	pub rotation_period: Option<f64>,
	#[serde(default)]
	pub luminosity_solar: f64,
	#[serde(default)]
	pub radius_km: f64,
	#[serde(default)]
	pub albedo: f64,
	pub orbit_frame: Option<FrameSpecFile>,
	/// Pole orientation of the body.
	pub body_frame: Option<FrameSpecFile>,
	#[serde(default)]
	pub always_visible: bool,
}

impl SceneFile {
	/// Load a scene file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read scene file: {}", path.display()))?;
		let scene: SceneFile =
			toml::from_str(&content).with_context(|| "Failed to parse scene TOML")?;
		scene.config.validate().context("Invalid [config] section")?;
		scene.unit_km()?;
		Ok(scene)
	}

	/// Kilometres per file unit.
	pub fn unit_km(&self) -> Result<f64> {
		Ok(match self.units.to_ascii_lowercase().as_str() {
			"km" => 1.0,
			"au" => KM_PER_AU,
			"ly" => KM_PER_LIGHT_YEAR,
			"pc" => KM_PER_PARSEC,
			other => bail!("unknown units '{}', expected km, au, ly or pc", other),
		})
	}

	/// Build the world described by the file. The observer is placed but
	/// no frame has run yet.
	pub fn build(&self) -> Result<StellarWorld> {
		let unit = self.unit_km()?;
		let mut world = StellarWorld::new(self.config.clone())?;
		let mut names: HashMap<&str, AnchorId> = HashMap::new();

		for spec in &self.system {
			let parent = parent_of(&world, &names, spec.parent.as_deref())?;
			let id = world
				.add_system(
					parent,
					Arc::new(FixedOrbit(vec3(spec.position) * unit)),
					spec.primary.as_deref(),
					[spec.name.as_str()],
				)
				.with_context(|| format!("Adding system '{}'", spec.name))?;
			names.insert(&spec.name, id);
		}
		for spec in &self.octree {
			let parent = parent_of(&world, &names, spec.parent.as_deref())?;
			let id = world
				.add_octree_anchor(parent, vec3(spec.position) * unit, [spec.name.as_str()])
				.with_context(|| format!("Adding octree '{}'", spec.name))?;
			names.insert(&spec.name, id);
		}

		for spec in &self.anchor {
			let id = self
				.add_anchor(&mut world, spec, unit)
				.with_context(|| format!("Adding anchor '{}'", spec.name))?;
			let parent = parent_of(&world, &names, spec.parent.as_deref())?;
			world.add_child(parent, id)?;
			names.insert(&spec.name, id);
		}

		// Frames may name anchors declared later in the file.
		for spec in &self.anchor {
			let Some(&id) = names.get(spec.name.as_str()) else {
				continue;
			};
			if let Some(frame) = &spec.orbit_frame {
				world
					.set_orbit_frame(id, &frame.record())
					.with_context(|| format!("Orbit frame of '{}'", spec.name))?;
			}
			if let Some(frame) = &spec.body_frame {
				world
					.set_body_frame(id, &frame.record())
					.with_context(|| format!("Body frame of '{}'", spec.name))?;
			}
		}

		world.finish_catalog().context("Catalog validation failed")?;

		let o = &self.observer;
		let orientation = DQuat::from_rotation_z(o.yaw_deg.to_radians())
			* DQuat::from_rotation_x(o.pitch_deg.to_radians());
		let fov = o.fov_deg.to_radians();
		world.set_observer_pose(
			DVec3::ZERO,
			vec3(o.position) * unit,
			orientation,
			fov / o.viewport_height.max(1.0),
			Frustum::perspective(fov, o.aspect),
		);
		Ok(world)
	}

	fn add_anchor(&self, world: &mut StellarWorld, spec: &AnchorSpec, unit: f64) -> Result<AnchorId> {
		let mut kind = AnchorKind::EMPTY;
		for name in &spec.kind {
			match AnchorKind::from_name(name) {
				Some(k) => kind |= k,
				None => bail!("unknown kind '{}'", name),
			}
		}

		let orbit: Arc<dyn Orbit> = match &spec.orbit {
			Some(o) => Arc::new(CircularOrbit {
				radius: o.radius * unit,
				period: o.period,
				inclination: o.inclination_deg.to_radians(),
				ascending_node: o.node_deg.to_radians(),
				phase: o.phase_deg.to_radians(),
			}),
			None => Arc::new(FixedOrbit(vec3(spec.position) * unit)),
		};
		let rotation: Arc<dyn Rotation> = match spec.rotation_period {
			Some(period) => Arc::new(UniformRotation::new(period)),
			None => Arc::new(FixedRotation::default()),
		};

		let names = std::iter::once(spec.name.as_str()).chain(spec.aliases.iter().map(String::as_str));
		let id = world.add_stellar_anchor(
			kind,
			orbit,
			rotation,
			spec.luminosity_solar * SOLAR_LUMINOSITY,
			spec.radius_km,
			names,
		)?;
		if spec.albedo != 0.0 {
			world.set_albedo(id, spec.albedo)?;
		}
		if spec.always_visible {
			world.set_visibility_override(id)?;
		}
		Ok(id)
	}
}

fn vec3(v: [f64; 3]) -> DVec3 {
	DVec3::from_array(v)
}

fn parent_of(world: &StellarWorld, names: &HashMap<&str, AnchorId>, parent: Option<&str>) -> Result<AnchorId> {
	match parent {
		None => Ok(world.universe()),
		Some(name) => names
			.get(name)
			.copied()
			.with_context(|| format!("Unknown parent '{}' (containers must be declared first)", name)),
	}
}
