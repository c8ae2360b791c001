//! # Planar Geometry
//!
//! Parcels and regulatory layers share one geometry type. Coordinates are
//! planar feet (LA County publishes in State Plane California Zone V,
//! EPSG:2229), so buffers and distances are plain Euclidean feet.
//!
//! The wire form ([`Shape`]) follows GeoJSON: `{"type": "Polygon",
//! "coordinates": [[[x, y], ...]]}`. Construction validates the rings and
//! builds the `geo` representation once; predicates then run against that.
//!
//! ## Spatial Relations
//!
//! [`Geometry::relate`] classifies a layer against a parcel:
//!
//! | Relation | Condition |
//! |----------|-----------|
//! | `Contains` | the layer covers the whole parcel |
//! | `Overlaps` | the interiors share area (or a point parcel sits on the layer boundary) |
//! | `Adjacent` | disjoint but within the search buffer |
//!
//! Point layers (transit stops) never contain or overlap anything; they
//! only produce `Adjacent` with their distance to the parcel.

use geo::{Area, BooleanOps, BoundingRect, EuclideanDistance, Relate};
use geo::{Coord, LineString, MultiPolygon, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_digest, ContentDigest};
use crate::error::{CanonicalizationError, GeometryError};
use crate::quantity::{Quantity, RelevanceWeight};

/// A ring of `[x, y]` positions.
pub type Ring = Vec<[f64; 2]>;

/// GeoJSON-shaped wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Shape {
    /// A single position, e.g. a parcel centroid or a transit stop.
    Point([f64; 2]),
    /// Exterior ring followed by holes.
    Polygon(Vec<Ring>),
    /// Several polygons.
    MultiPolygon(Vec<Vec<Ring>>),
}

#[derive(Debug, Clone)]
enum Planar {
    Point(Point<f64>),
    Area(MultiPolygon<f64>),
}

/// Validated geometry with a precomputed bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Shape", into = "Shape")]
pub struct Geometry {
    shape: Shape,
    planar: Planar,
    bbox: Rect<f64>,
}

impl PartialEq for Geometry {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
    }
}

impl From<Geometry> for Shape {
    fn from(g: Geometry) -> Self {
        g.shape
    }
}

impl TryFrom<Shape> for Geometry {
    type Error = GeometryError;

    fn try_from(shape: Shape) -> Result<Self, Self::Error> {
        Self::new(shape)
    }
}

/// How a layer relates to a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialRelation {
    /// The layer covers the parcel entirely.
    Contains,
    /// The layer covers part of the parcel.
    Overlaps {
        /// Share of the parcel's area inside the layer, `1..=9999` bp.
        covered: RelevanceWeight,
    },
    /// Disjoint (or touching only at the boundary) but within the buffer.
    Adjacent {
        /// Shortest distance from parcel to layer.
        distance_ft: Quantity,
    },
}

/// Weight given to a point parcel lying exactly on a layer boundary.
const BOUNDARY_POINT_WEIGHT_BP: u32 = 5_000;

impl Geometry {
    /// Validate a wire shape.
    pub fn new(shape: Shape) -> Result<Self, GeometryError> {
        let planar = match &shape {
            Shape::Point(p) => Planar::Point(Point::from(coord(*p)?)),
            Shape::Polygon(rings) => Planar::Area(MultiPolygon::new(vec![polygon(rings)?])),
            Shape::MultiPolygon(polys) => {
                if polys.is_empty() {
                    return Err(GeometryError::EmptyMultiPolygon);
                }
                let members = polys
                    .iter()
                    .map(|rings| polygon(rings))
                    .collect::<Result<Vec<_>, _>>()?;
                Planar::Area(MultiPolygon::new(members))
            }
        };
        let bbox = match &planar {
            Planar::Point(p) => Rect::new(p.0, p.0),
            Planar::Area(mp) => mp.bounding_rect().ok_or(GeometryError::ZeroArea)?,
        };
        Ok(Self {
            shape,
            planar,
            bbox,
        })
    }

    /// Convenience constructor for a point.
    pub fn point(x: f64, y: f64) -> Result<Self, GeometryError> {
        Self::new(Shape::Point([x, y]))
    }

    /// Convenience constructor for an axis-aligned rectangle.
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, GeometryError> {
        Self::new(Shape::Polygon(vec![vec![
            [min_x, min_y],
            [max_x, min_y],
            [max_x, max_y],
            [min_x, max_y],
            [min_x, min_y],
        ]]))
    }

    /// The wire shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// True for point geometries (centroids, transit stops).
    pub fn is_point(&self) -> bool {
        matches!(self.planar, Planar::Point(_))
    }

    /// Area in square feet (zero for points).
    pub fn area_sq_ft(&self) -> f64 {
        match &self.planar {
            Planar::Point(_) => 0.0,
            Planar::Area(mp) => mp.unsigned_area(),
        }
    }

    /// Cheap bounding-box test: could `other` lie within `buffer_ft` of self?
    pub fn may_be_within(&self, other: &Geometry, buffer_ft: f64) -> bool {
        let a = self.bbox;
        let b = other.bbox;
        a.min().x - buffer_ft <= b.max().x
            && b.min().x <= a.max().x + buffer_ft
            && a.min().y - buffer_ft <= b.max().y
            && b.min().y <= a.max().y + buffer_ft
    }

    /// Shortest Euclidean distance between the two geometries (zero when
    /// they intersect).
    pub fn distance_to(&self, other: &Geometry) -> f64 {
        match (&self.planar, &other.planar) {
            (Planar::Point(a), Planar::Point(b)) => a.euclidean_distance(b),
            (Planar::Point(p), Planar::Area(mp)) | (Planar::Area(mp), Planar::Point(p)) => mp
                .iter()
                .map(|poly| p.euclidean_distance(poly))
                .fold(f64::INFINITY, f64::min),
            (Planar::Area(a), Planar::Area(b)) => a
                .iter()
                .flat_map(|pa| b.iter().map(move |pb| pa.euclidean_distance(pb)))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// True if `layer` lies within `buffer_ft` of this geometry.
    pub fn within_distance(&self, layer: &Geometry, buffer_ft: f64) -> bool {
        self.may_be_within(layer, buffer_ft) && self.distance_to(layer) <= buffer_ft
    }

    /// Classify `layer` against this (parcel) geometry.
    ///
    /// Returns `None` when the layer is farther than `buffer_ft` away.
    pub fn relate(&self, layer: &Geometry, buffer_ft: f64) -> Option<SpatialRelation> {
        if !self.may_be_within(layer, buffer_ft) {
            return None;
        }
        match (&self.planar, &layer.planar) {
            (_, Planar::Point(_)) => self.adjacent(layer, buffer_ft),
            (Planar::Point(p), Planar::Area(area)) => {
                let matrix = area.relate(p);
                if matrix.is_contains() {
                    Some(SpatialRelation::Contains)
                } else if matrix.is_intersects() {
                    Some(SpatialRelation::Overlaps {
                        covered: RelevanceWeight::from_basis_points(BOUNDARY_POINT_WEIGHT_BP),
                    })
                } else {
                    self.adjacent(layer, buffer_ft)
                }
            }
            (Planar::Area(parcel), Planar::Area(area)) => {
                let matrix = area.relate(parcel);
                if matrix.is_contains() {
                    return Some(SpatialRelation::Contains);
                }
                if matrix.is_intersects() {
                    let parcel_area = parcel.unsigned_area();
                    let shared = parcel.intersection(area).unsigned_area();
                    if parcel_area > 0.0 && shared > 0.0 {
                        let bp = ((shared / parcel_area) * 10_000.0).round() as u32;
                        return Some(SpatialRelation::Overlaps {
                            covered: RelevanceWeight::from_basis_points(bp.clamp(1, 9_999)),
                        });
                    }
                    // Boundary contact only.
                    return Some(SpatialRelation::Adjacent {
                        distance_ft: Quantity::ZERO,
                    });
                }
                self.adjacent(layer, buffer_ft)
            }
        }
    }

    fn adjacent(&self, layer: &Geometry, buffer_ft: f64) -> Option<SpatialRelation> {
        let distance = self.distance_to(layer);
        if distance <= buffer_ft {
            Quantity::from_f64(distance)
                .ok()
                .map(|distance_ft| SpatialRelation::Adjacent { distance_ft })
        } else {
            None
        }
    }

    /// Coordinates quantized to hundredths of a foot.
    pub fn fingerprint(&self) -> GeometryFingerprint {
        let q = |p: &[f64; 2]| [quantize(p[0]), quantize(p[1])];
        let ring = |r: &Ring| r.iter().map(q).collect::<Vec<_>>();
        match &self.shape {
            Shape::Point(p) => GeometryFingerprint::Point(q(p)),
            Shape::Polygon(rings) => GeometryFingerprint::Polygon(rings.iter().map(ring).collect()),
            Shape::MultiPolygon(polys) => GeometryFingerprint::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(ring).collect())
                    .collect(),
            ),
        }
    }

    /// Content digest of the quantized geometry. Two geometries are
    /// treated as identical iff their digests are equal.
    pub fn digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(&self.fingerprint())?))
    }
}

/// Integer (centi-foot) rendering of a geometry, safe to canonicalize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeometryFingerprint {
    /// Quantized point.
    Point([i64; 2]),
    /// Quantized polygon rings.
    Polygon(Vec<Vec<[i64; 2]>>),
    /// Quantized multi-polygon.
    MultiPolygon(Vec<Vec<Vec<[i64; 2]>>>),
}

fn quantize(v: f64) -> i64 {
    (v * 100.0).round() as i64
}

fn coord(p: [f64; 2]) -> Result<Coord<f64>, GeometryError> {
    if !p[0].is_finite() || !p[1].is_finite() {
        return Err(GeometryError::NonFiniteCoordinate { x: p[0], y: p[1] });
    }
    Ok(Coord { x: p[0], y: p[1] })
}

fn polygon(rings: &[Ring]) -> Result<Polygon<f64>, GeometryError> {
    let mut line_strings = Vec::with_capacity(rings.len());
    for (i, ring) in rings.iter().enumerate() {
        if ring.len() < 4 {
            return Err(GeometryError::InvalidRing {
                ring: i,
                reason: format!("needs at least 4 positions, has {}", ring.len()),
            });
        }
        if ring.first() != ring.last() {
            return Err(GeometryError::InvalidRing {
                ring: i,
                reason: "first and last positions differ".to_string(),
            });
        }
        let coords = ring.iter().map(|p| coord(*p)).collect::<Result<Vec<_>, _>>()?;
        line_strings.push(LineString::new(coords));
    }
    let mut iter = line_strings.into_iter();
    let exterior = iter.next().ok_or(GeometryError::InvalidRing {
        ring: 0,
        reason: "polygon has no exterior ring".to_string(),
    })?;
    let poly = Polygon::new(exterior, iter.collect());
    if poly.unsigned_area() <= 0.0 {
        return Err(GeometryError::ZeroArea);
    }
    Ok(poly)
}
