//! Physical, astronomical and octree-shape constants.
//!
//! World positions are kilometres in double precision. Angles at the algebra
//! layer are radians; catalog front-ends convert before calling in.
//!
//! # Distance Ladder
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                          DISTANCE LADDER (km)                         │
//! ├───────────────────────────────────────────────────────────────────────┤
//! │                                                                       │
//! │  1 AU          1.495978707e8                                          │
//! │  1 light-year  9.4607304725808e12   (~63 241 AU)                      │
//! │  1 parsec      3.0856775814913673e13 (~3.2616 ly)                     │
//! │                                                                       │
//! │  Observable range: 10^0 .. 10^10 ly  =>  ~10^13 .. 10^23 km           │
//! │  f64 keeps ~15.9 significant digits: metre precision out to ~10^12 km │
//! │  f32 keeps ~7.2 digits: the renderer only ever sees remapped values   │
//! │                                                                       │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Octree Luminosity Thresholds
//!
//! ```text
//! level 0 (root)   threshold = T
//! level 1          threshold = T * 0.25     (~1.5 magnitudes fainter)
//! level 2          threshold = T * 0.0625
//! ...
//! level n          threshold = T * 0.25^n
//! ```

/// Kilometres per astronomical unit.
pub const KM_PER_AU: f64 = 1.495_978_707e8;

/// Kilometres per light-year.
pub const KM_PER_LIGHT_YEAR: f64 = 9.460_730_472_580_8e12;

/// Kilometres per parsec.
pub const KM_PER_PARSEC: f64 = 3.085_677_581_491_367_3e13;

/// Metres per kilometre (point radiance is evaluated in SI units).
pub const METRES_PER_KM: f64 = 1000.0;

/// Nominal solar luminosity in watts (IAU 2015 B3).
pub const SOLAR_LUMINOSITY: f64 = 3.828e26;

/// Absolute visual magnitude of the Sun.
pub const SOLAR_ABSOLUTE_MAGNITUDE: f64 = 4.83;

/// Mean obliquity of the ecliptic at J2000.0 in radians (23.4392911°).
pub const J2000_OBLIQUITY: f64 = 0.409_092_804_222_328_97;

/// Default faintest apparent magnitude drawn as a point.
pub const DEFAULT_LOWEST_APP_MAGNITUDE: f64 = 6.0;

/// Default minimum visible size (pixels) before a body is resolved.
pub const DEFAULT_MIN_BODY_SIZE: f64 = 1.0;

/// Default render-space midplane distance.
pub const DEFAULT_MIDPLANE: f64 = 1000.0;

/// Default world kilometres per render unit.
pub const DEFAULT_SCENE_SCALE: f64 = 1.0;

/// Leaves a node holds before it splits.
pub const OCTREE_MAX_LEAVES: usize = 75;

/// Deepest octree level allowed to split.
pub const OCTREE_MAX_LEVEL: u32 = 200;

/// Luminosity threshold ratio between a child and its parent.
pub const OCTREE_CHILD_FACTOR: f64 = 0.25;

/// Absolute magnitude whose luminosity seeds the root threshold.
///
/// Objects brighter than this stay in the root node.
pub const OCTREE_ROOT_ABS_MAGNITUDE: f64 = 6.0;

/// Default root cell width: 10^10 light-years.
pub const OCTREE_ROOT_WIDTH: f64 = 1.0e10 * KM_PER_LIGHT_YEAR;

/// Default sample count for generated depth lookup tables.
pub const DEFAULT_LOOKUP_TABLE_SAMPLES: usize = 1024;

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
