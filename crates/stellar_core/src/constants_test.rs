use super::*;

/// A parsec is ~3.2616 light-years.
#[test]
fn test_parsec_in_light_years() {
  let ratio = KM_PER_PARSEC / KM_PER_LIGHT_YEAR;
  assert!((ratio - 3.261_563_8).abs() < 1e-6, "ratio was {}", ratio);
}

/// A light-year is ~63 241 AU.
#[test]
fn test_light_year_in_au() {
  let ratio = KM_PER_LIGHT_YEAR / KM_PER_AU;
  assert!((ratio - 63_241.077).abs() < 1e-2, "ratio was {}", ratio);
}

/// 84381.448 arcseconds is 23.439291111 degrees.
#[test]
fn test_obliquity_degrees() {
  assert!((J2000_OBLIQUITY.to_degrees() - 23.439_291_111).abs() < 1e-9);
}

#[test]
fn test_octree_shape_defaults() {
  assert_eq!(OCTREE_MAX_LEAVES, 75);
  assert_eq!(OCTREE_MAX_LEVEL, 200);
  assert_eq!(OCTREE_CHILD_FACTOR, 0.25);
}
