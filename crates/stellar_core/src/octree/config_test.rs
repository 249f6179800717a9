use super::*;

// =========================================================================
// OctreeConfig - level math
// =========================================================================

/// Each level is a quarter of the parent's threshold.
#[test]
fn test_threshold_quarters_per_level() {
  let config = OctreeConfig::default();
  let t0 = config.get_threshold(0);
  let t1 = config.get_threshold(1);
  let t3 = config.get_threshold(3);

  assert_eq!(t0, config.root_threshold, "level 0 is the root threshold");
  assert!((t1 / t0 - 0.25).abs() < 1e-15, "level 1 should be t0/4");
  assert!((t3 / t0 - 0.25f64.powi(3)).abs() < 1e-15, "level 3 should be t0/64");
}

/// Width halves per level.
#[test]
fn test_width_halves_per_level() {
  let config = OctreeConfig {
    root_width: 1024.0,
    ..OctreeConfig::default()
  };
  assert_eq!(config.get_width(0), 1024.0);
  assert_eq!(config.get_width(1), 512.0);
  assert_eq!(config.get_width(10), 1.0);
}

/// radius = width * sqrt(3) / 2
#[test]
fn test_radius_circumscribes_cube() {
  let r = OctreeConfig::get_radius(2.0);
  assert!((r - 3f64.sqrt()).abs() < 1e-15);
}

/// Root threshold default corresponds to absolute magnitude 6.
#[test]
fn test_default_root_threshold_is_mag_6() {
  let config = OctreeConfig::default();
  let mag = crate::magnitude::abs_mag_from_luminosity(config.root_threshold);
  assert!((mag - 6.0).abs() < 1e-9, "mag was {}", mag);
}

#[test]
fn test_should_split() {
  let config = OctreeConfig::default();
  assert!(!config.should_split(0, 74));
  assert!(config.should_split(0, 75));
  assert!(!config.should_split(200, 1000), "max_level never splits");
}

#[test]
fn test_validate_rejects_bad_shapes() {
  let ok = OctreeConfig::default();
  assert!(ok.validate().is_ok());

  let zero_leaves = OctreeConfig { max_leaves: 0, ..ok.clone() };
  assert!(zero_leaves.validate().is_err());

  let factor_one = OctreeConfig { child_factor: 1.0, ..ok.clone() };
  assert!(factor_one.validate().is_err());

  let no_width = OctreeConfig { root_width: 0.0, ..ok };
  assert!(no_width.validate().is_err());
}
