//! Magnitude and radiometry helpers.
//!
//! ```text
//! app_mag = abs_mag + 5 * (log10(d / 1 pc) - 1)
//! abs_mag = M_sun - 2.5 * log10(L / L_sun)
//! radiance(d) = flux / (4 * pi * (d * 1000)^2)      [W/m^2, d in km]
//! ```
//!
//! Degenerate inputs (zero distance, zero luminosity) map to infinities or
//! zero, never NaN.

use std::f64::consts::PI;

use crate::constants::{KM_PER_PARSEC, METRES_PER_KM, SOLAR_ABSOLUTE_MAGNITUDE, SOLAR_LUMINOSITY};

/// Absolute magnitude of an object radiating `luminosity` watts.
///
/// Non-positive luminosity is infinitely faint.
#[inline]
pub fn abs_mag_from_luminosity(luminosity: f64) -> f64 {
  if luminosity <= 0.0 || luminosity.is_nan() {
    return f64::INFINITY;
  }
  SOLAR_ABSOLUTE_MAGNITUDE - 2.5 * (luminosity / SOLAR_LUMINOSITY).log10()
}

/// Luminosity in watts of an object with absolute magnitude `abs_mag`.
#[inline]
pub fn luminosity_from_abs_mag(abs_mag: f64) -> f64 {
  SOLAR_LUMINOSITY * 10f64.powf((SOLAR_ABSOLUTE_MAGNITUDE - abs_mag) / 2.5)
}

/// Apparent magnitude at `distance_km` of an object with absolute magnitude
/// `abs_mag`. A non-positive distance is infinitely bright.
#[inline]
pub fn apparent_from_absolute(abs_mag: f64, distance_km: f64) -> f64 {
  if distance_km <= 0.0 {
    return f64::NEG_INFINITY;
  }
  abs_mag + 5.0 * ((distance_km / KM_PER_PARSEC).log10() - 1.0)
}

/// Absolute magnitude of an object seen at `app_mag` from `distance_km`.
#[inline]
pub fn absolute_from_apparent(app_mag: f64, distance_km: f64) -> f64 {
  if distance_km <= 0.0 {
    return f64::INFINITY;
  }
  app_mag - 5.0 * ((distance_km / KM_PER_PARSEC).log10() - 1.0)
}

/// Apparent magnitude of `luminosity` watts seen from `distance_km`.
#[inline]
pub fn apparent_from_luminosity(luminosity: f64, distance_km: f64) -> f64 {
  apparent_from_absolute(abs_mag_from_luminosity(luminosity), distance_km)
}

/// Irradiance in W/m² at `distance_km` from a point source of `flux` watts.
///
/// Returns 0 at zero distance.
#[inline]
pub fn point_radiance(flux: f64, distance_km: f64) -> f64 {
  if distance_km <= 0.0 {
    return 0.0;
  }
  let d_m = distance_km * METRES_PER_KM;
  flux / (4.0 * PI * d_m * d_m)
}

/// Luminosity reflected by a Lambert sphere.
///
/// `albedo * pi * r^2 * irradiance * (1 + cos(phase)) / 2`, radius in km,
/// irradiance in W/m².
#[inline]
pub fn reflected_luminosity(albedo: f64, radius_km: f64, irradiance: f64, cos_phase: f64) -> f64 {
  let r_m = radius_km * METRES_PER_KM;
  let phase_term = (1.0 + cos_phase.clamp(-1.0, 1.0)) * 0.5;
  (albedo * PI * r_m * r_m * irradiance * phase_term).max(0.0)
}

#[cfg(test)]
#[path = "magnitude_test.rs"]
mod magnitude_test;
