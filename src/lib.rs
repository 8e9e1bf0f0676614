//! # dike-georef
//!
//! Per-image **georeferencing for dike/outcrop survey tables**: fit an affine
//! transform from printed-map-sheet pixel coordinates to Web Mercator meters
//! for every source image with at least two surveyed control points, then
//! back-fill projected and geographic coordinates for all other observations
//! on that image.
//!
//! Geologists digitize observations off printed map sheets, recording where
//! on the sheet each dike sits (in centimeters or image pixels) and, for a
//! handful of observations per sheet, the surveyed WGS84 position. This crate
//! turns those few control points into coordinates for the whole sheet.
//!
//! ## Example
//!
//! ```
//! use dike_georef::{augment_with_coordinates, DikeRecord, SheetPoint, SheetUnit};
//!
//! let sheet = |x, y| SheetPoint::new(x, y, SheetUnit::Pixels);
//! let records = vec![
//!     // Two control points with surveyed coordinates...
//!     DikeRecord::new("sheet-21.png", sheet(100.0, 400.0)).with_known(36.50, 127.80),
//!     DikeRecord::new("sheet-21.png", sheet(900.0, 150.0)).with_known(36.58, 127.92),
//!     // ...and an observation with only its sheet position.
//!     DikeRecord::new("sheet-21.png", sheet(500.0, 275.0)),
//! ];
//!
//! let records = augment_with_coordinates(records).unwrap();
//! let filled = records[2].computed.unwrap();
//! assert!(filled.lat > 36.50 && filled.lat < 36.58);
//! assert!(filled.lng > 127.80 && filled.lng < 127.92);
//! ```
//!
//! ## Algorithm overview
//!
//! 1. **Group** records by source image.
//! 2. **Fit**, per image: normalize sheet coordinates to pixels (centimeters
//!    convert at 96 dpi), take `max_y` over the surveyed records, project the
//!    surveyed WGS84 coordinates to EPSG:3857, flip pixel y against `max_y`,
//!    and fit `projected = slope · pixel + intercept` per axis by ordinary
//!    least squares.
//! 3. **Apply**, per record: run the image's transform and inverse-project to
//!    back-fill WGS84 coordinates where none were surveyed.
//!
//! Each axis is fit independently; rotation/shear coupling between axes is
//! deliberately not modeled. Groups without a derivable transform (too few
//! control points, degenerate pixel geometry) leave their records untouched,
//! which is missing data rather than an error.

/// Batch orchestration: group, fit, apply.
pub mod georef;
/// WGS84 ↔ Web Mercator (EPSG:3857) projection.
pub mod mercator;
/// Observation records and sheet coordinates.
pub mod record;
/// Per-image affine transform fitting and application.
pub mod transform;

pub use georef::{augment_with_coordinates, augment_with_summary, FitSummary, GeorefError};
pub use mercator::{
    geo_to_mercator, mercator_to_geo, ProjectionError, EARTH_RADIUS_M, MAX_LATITUDE_DEG,
};
pub use record::{DikeRecord, GeoCoord, SheetPoint, SheetUnit};
pub use transform::{ControlPoint, SheetTransform};
