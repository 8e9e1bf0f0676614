//! Spherical Web Mercator (EPSG:3857) projection.
//!
//! Forward and inverse transforms between WGS84 degrees and Web Mercator
//! meters, the common metric space between sheet pixels and geographic
//! coordinates:
//!
//! ```text
//! x = R · λ
//! y = R · ln(tan(π/4 + φ/2))
//! ```
//!
//! with `R = 6 378 137 m` and λ, φ in radians. The projection is undefined at
//! the poles; the square map cuts off at `φ = ±atan(sinh(π)) ≈ ±85.05113°`,
//! and latitudes beyond that (or any non-finite input) are rejected.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use thiserror::Error;

/// WGS84 semi-major axis, the Web Mercator sphere radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude bound of the square Web Mercator map: `atan(sinh(π))` in degrees.
pub const MAX_LATITUDE_DEG: f64 = 85.051_128_779_806_59;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("non-finite coordinate ({0}, {1})")]
    NonFinite(f64, f64),
    #[error("latitude {0}° outside the ±85.05113° Web Mercator domain")]
    LatitudeOutOfRange(f64),
}

/// Forward projection: WGS84 `(lng, lat)` degrees → EPSG:3857 `(x, y)` meters.
pub fn geo_to_mercator(lng: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
    if !lng.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFinite(lng, lat));
    }
    if lat.abs() > MAX_LATITUDE_DEG {
        return Err(ProjectionError::LatitudeOutOfRange(lat));
    }

    let x = EARTH_RADIUS_M * lng.to_radians();
    let y = EARTH_RADIUS_M * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Ok((x, y))
}

/// Inverse projection: EPSG:3857 `(x, y)` meters → WGS84 `(lng, lat)` degrees.
pub fn mercator_to_geo(x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(ProjectionError::NonFinite(x, y));
    }

    let lng = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees();
    Ok((lng, lat))
}
