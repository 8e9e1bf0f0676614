//! Observation records and sheet-local coordinates.
//!
//! A [`DikeRecord`] is one row of the survey table: the map-sheet image it was
//! digitized from, where on that sheet the observation sits, optionally the
//! surveyed WGS84 coordinate, and the descriptive fields geologists record in
//! the field. The georeferencing batch reads the first three and fills the
//! computed output fields; everything else passes through untouched.

/// WGS84 geographic coordinate in degrees.
///
/// A record either has a complete surveyed coordinate or none at all; there is
/// no partial latitude-without-longitude state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoord {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

/// Unit of a sheet-local coordinate.
///
/// Survey sheets are digitized two ways: measured in centimeters on the
/// printed sheet, or read off directly as image pixels. The original import
/// workflow inferred the unit from the runtime value type; here it is an
/// explicit per-record flag, with [`SheetPoint::inferred`] covering
/// loosely-typed tabular imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetUnit {
    /// Centimeters on the printed sheet, converted at 96 dpi.
    Centimeters,
    /// Already image pixels.
    Pixels,
}

// Sheet scans are 96 dpi; 1 cm = 0.393701 in.
const CM_TO_INCH: f64 = 0.393701;
const DPI: f64 = 96.0;

/// Coordinate on a printed map sheet, in image convention: x grows right,
/// y grows down from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetPoint {
    pub x: f64,
    pub y: f64,
    pub unit: SheetUnit,
}

impl SheetPoint {
    pub fn new(x: f64, y: f64, unit: SheetUnit) -> Self {
        Self { x, y, unit }
    }

    /// Classify the unit from the values themselves: a point is a centimeter
    /// measurement only when both components are fractional; integral values
    /// are taken as pixels.
    ///
    /// The decision is per point, never per image group. This reproduces the
    /// float-vs-int heuristic of the original Excel import for callers that
    /// have lost the unit information.
    pub fn inferred(x: f64, y: f64) -> Self {
        let unit = if x.fract() != 0.0 && y.fract() != 0.0 {
            SheetUnit::Centimeters
        } else {
            SheetUnit::Pixels
        };
        Self { x, y, unit }
    }

    /// Unit-normalized pixel coordinates, rounded to whole pixels.
    ///
    /// Centimeters convert as `round(cm * 0.393701 * 96)`.
    pub fn to_pixels(&self) -> (i64, i64) {
        match self.unit {
            SheetUnit::Centimeters => (
                (self.x * CM_TO_INCH * DPI).round() as i64,
                (self.y * CM_TO_INCH * DPI).round() as i64,
            ),
            SheetUnit::Pixels => (self.x.round() as i64, self.y.round() as i64),
        }
    }

    /// False when either component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One survey observation row.
///
/// Computed fields start as `None` and are filled by
/// [`augment_with_coordinates`](crate::augment_with_coordinates) for every
/// record whose image group yields a transform. Surveyed coordinates are
/// never overwritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DikeRecord {
    /// Source map-sheet image this record was digitized from. Records without
    /// an image never receive computed coordinates.
    pub image: Option<String>,
    /// Sheet-local position of the observation.
    pub sheet: Option<SheetPoint>,
    /// Surveyed WGS84 coordinate, when the geologist recorded one.
    pub known: Option<GeoCoord>,

    // Descriptive survey fields, passed through untouched.
    pub symbol: Option<String>,
    pub stratum: Option<String>,
    pub rock_type: Option<String>,
    pub era: Option<String>,
    pub address: Option<String>,
    pub color: Option<String>,
    pub distance_km: Option<f64>,
    pub angle_deg: Option<f64>,

    // Computed outputs.
    /// Unit-normalized pixel coordinate.
    pub pixel: Option<(i64, i64)>,
    /// Vertically flipped pixel y (`max_y - pixel_y`) within the record's
    /// image group.
    pub flipped_y: Option<i64>,
    /// Web Mercator (EPSG:3857) coordinate in meters.
    pub projected: Option<(f64, f64)>,
    /// Back-filled WGS84 coordinate for records lacking a surveyed one.
    pub computed: Option<GeoCoord>,
}

impl DikeRecord {
    /// Record with an image group and sheet position, everything else unset.
    pub fn new(image: impl Into<String>, sheet: SheetPoint) -> Self {
        Self {
            image: Some(image.into()),
            sheet: Some(sheet),
            ..Self::default()
        }
    }

    /// Attach a surveyed WGS84 coordinate, making this record a control
    /// point for its image group.
    pub fn with_known(mut self, lat: f64, lng: f64) -> Self {
        self.known = Some(GeoCoord { lat, lng });
        self
    }

    /// The coordinate to display or sync: the surveyed one when present, the
    /// back-filled one otherwise.
    pub fn effective_coord(&self) -> Option<GeoCoord> {
        self.known.or(self.computed)
    }
}
