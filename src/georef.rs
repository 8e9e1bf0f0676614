//! Batch georeferencing: fit one transform per map-sheet image, back-fill
//! coordinates for every record on that image.
//!
//! Two sequential passes over the record set:
//!
//! 1. **Fit** — group records by image, gather each group's control points
//!    (records with both a sheet position and a surveyed coordinate), project
//!    the surveyed coordinates to Web Mercator, and fit a [`SheetTransform`]
//!    per group. Groups with fewer than two usable control points simply
//!    yield no transform.
//! 2. **Apply** — run every record through its group's transform, filling
//!    pixel, projected, and back-filled geographic coordinates. Surveyed
//!    coordinates are never overwritten.
//!
//! Failures are local: a control point whose projection fails drops out of
//! the fit, a group whose fit degenerates yields no transform, and a record
//! that cannot be back-filled is left blank. The only fatal condition is a
//! structurally malformed record, which indicates the upstream loader broke
//! its contract.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mercator::{geo_to_mercator, mercator_to_geo};
use crate::record::{DikeRecord, GeoCoord};
use crate::transform::{ControlPoint, SheetTransform};

#[derive(Debug, Error, PartialEq)]
pub enum GeorefError {
    /// A record structurally violates the row contract. Ordinary data-quality
    /// problems (missing coordinates, failed projections) skip the affected
    /// row; non-finite sheet coordinates can only come from a broken loader
    /// and fail the whole batch.
    #[error("record {index}: non-finite sheet coordinate ({x}, {y})")]
    MalformedRecord { index: usize, x: f64, y: f64 },
}

/// Per-image fit report.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    pub image: String,
    /// Records in the group.
    pub records: usize,
    /// Control points that survived projection and entered the fit.
    pub control_points: usize,
    /// Whether the group yielded a transform.
    pub fitted: bool,
}

/// Augment a batch of survey records with projected and geographic
/// coordinates, per image group.
///
/// Transforms are computed once per call and discarded; repeated calls are
/// independent. Records whose group yields no transform pass through
/// untouched.
pub fn augment_with_coordinates(
    records: Vec<DikeRecord>,
) -> Result<Vec<DikeRecord>, GeorefError> {
    let (records, _) = augment_with_summary(records)?;
    Ok(records)
}

/// [`augment_with_coordinates`], also returning a per-image [`FitSummary`]
/// (ordered by image name).
pub fn augment_with_summary(
    mut records: Vec<DikeRecord>,
) -> Result<(Vec<DikeRecord>, Vec<FitSummary>), GeorefError> {
    // Structural validation up front; everything after treats bad data as a
    // per-row skip.
    for (index, rec) in records.iter().enumerate() {
        if let Some(sheet) = rec.sheet {
            if !sheet.is_finite() {
                return Err(GeorefError::MalformedRecord {
                    index,
                    x: sheet.x,
                    y: sheet.y,
                });
            }
        }
    }

    // Group record indices by image. BTreeMap keeps group order (and logs)
    // deterministic.
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, rec) in records.iter().enumerate() {
        if let Some(image) = &rec.image {
            groups.entry(image.clone()).or_default().push(i);
        }
    }

    // ── Pass 1: fit one transform per image ─────────────────────────────
    let mut transforms: BTreeMap<&str, SheetTransform> = BTreeMap::new();
    let mut summaries = Vec::with_capacity(groups.len());

    for (image, indices) in &groups {
        debug!("image {image:?}: {} records", indices.len());

        // Control candidates: sheet position plus surveyed coordinate.
        let mut candidates: Vec<(usize, i64, i64, GeoCoord)> = Vec::new();
        for &i in indices {
            if let (Some(sheet), Some(known)) = (records[i].sheet, records[i].known) {
                let (px, py) = sheet.to_pixels();
                candidates.push((i, px, py, known));
            }
        }

        if candidates.len() < 2 {
            debug!(
                "image {image:?}: {} control candidate(s), need 2, skipping",
                candidates.len()
            );
            summaries.push(FitSummary {
                image: image.clone(),
                records: indices.len(),
                control_points: candidates.len(),
                fitted: false,
            });
            continue;
        }

        // Flip baseline over every known-coordinate record, before projection
        // can drop any of them.
        let max_y = candidates
            .iter()
            .map(|&(_, _, py, _)| py)
            .max()
            .unwrap_or(0);

        // Project surveyed coordinates; a failed projection drops the point,
        // not the group. Control points get their pixel and projected fields
        // recorded here, from their own surveyed position.
        let mut control = Vec::with_capacity(candidates.len());
        for &(i, px, py, geo) in &candidates {
            match geo_to_mercator(geo.lng, geo.lat) {
                Ok(mercator) => {
                    let rec = &mut records[i];
                    rec.pixel = Some((px, py));
                    rec.flipped_y = Some(max_y - py);
                    rec.projected = Some(mercator);
                    control.push(ControlPoint { px, py, mercator });
                }
                Err(err) => {
                    warn!("image {image:?}: record {i}: {err}, control point dropped");
                }
            }
        }

        let fitted = SheetTransform::fit(&control, max_y);
        match &fitted {
            Some(t) => {
                info!(
                    "image {image:?}: x = {:.6}·px + {:.6}, y = {:.6}·flipped_py + {:.6} \
                     from {} control points",
                    t.x_slope,
                    t.x_intercept,
                    t.y_slope,
                    t.y_intercept,
                    control.len()
                );
                transforms.insert(image.as_str(), *t);
            }
            None => {
                warn!(
                    "image {image:?}: no transform ({} usable control points)",
                    control.len()
                );
            }
        }
        summaries.push(FitSummary {
            image: image.clone(),
            records: indices.len(),
            control_points: control.len(),
            fitted: fitted.is_some(),
        });
    }

    // ── Pass 2: apply each image's transform to all of its records ──────
    for (image, indices) in &groups {
        let Some(transform) = transforms.get(image.as_str()).copied() else {
            debug!("image {image:?}: no transform, records left as-is");
            continue;
        };
        for &i in indices {
            apply_to_record(&mut records[i], &transform, i);
        }
    }

    Ok((records, summaries))
}

/// Fill the computed fields of one record from its image's transform.
///
/// Fields populated during the fit pass (control points) are preserved, and
/// surveyed coordinates are never overwritten; back-filled geographic
/// coordinates are only computed for records lacking a surveyed one.
fn apply_to_record(rec: &mut DikeRecord, transform: &SheetTransform, index: usize) {
    let Some(sheet) = rec.sheet else {
        return; // no sheet position: nothing to compute
    };
    let (px, py) = sheet.to_pixels();

    if rec.pixel.is_none() {
        rec.pixel = Some((px, py));
    }
    if rec.flipped_y.is_none() {
        rec.flipped_y = Some(transform.flip_y(py));
    }
    if rec.projected.is_none() {
        rec.projected = Some(transform.apply(px, py));
    }

    if rec.known.is_none() {
        if let Some((x, y)) = rec.projected {
            match mercator_to_geo(x, y) {
                Ok((lng, lat)) => rec.computed = Some(GeoCoord { lat, lng }),
                Err(err) => {
                    warn!("record {index}: inverse projection failed: {err}");
                }
            }
        }
    }
}
