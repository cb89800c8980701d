//! Validity repair for polygonal geometry.
//!
//! Repair never fails. A geometry that cannot be turned into a valid one
//! degrades to the empty region and is flagged [`RepairStatus::Unreparable`]
//! so the caller can log the skip.

use crate::geometry::Region;
use geo::orient::{Direction, Orient};
use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{
    Area, BooleanOps, Coord, CoordsIter, Line, LineString, MultiPolygon, Polygon,
    RemoveRepeatedPoints, Validation, unary_union,
};
use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// How a repair went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    /// Already valid; only ring orientation was normalized.
    Valid,
    /// Invalid input was rebuilt into a valid equivalent.
    Fixed,
    /// Could not be repaired; replaced by the empty region.
    Unreparable,
}

/// A repaired region together with the status of the repair.
#[derive(Debug, Clone, PartialEq)]
pub struct Repair<R> {
    pub region: R,
    pub status: RepairStatus,
}

impl<R: Region> Repair<R> {
    pub fn valid(region: R) -> Self {
        Self {
            region,
            status: RepairStatus::Valid,
        }
    }

    pub fn fixed(region: R) -> Self {
        Self {
            region,
            status: RepairStatus::Fixed,
        }
    }

    pub fn unreparable() -> Self {
        Self {
            region: R::empty(),
            status: RepairStatus::Unreparable,
        }
    }
}

impl<R> Repair<R> {
    pub fn is_unreparable(&self) -> bool {
        self.status == RepairStatus::Unreparable
    }

    pub fn into_region(self) -> R {
        self.region
    }

    pub fn map<S>(self, f: impl FnOnce(R) -> S) -> Repair<S> {
        Repair {
            region: f(self.region),
            status: self.status,
        }
    }
}

/// Repair a multipolygon with the `geo` overlay engine.
///
/// Steps: reject non-finite coordinates, split self-intersecting rings into
/// simple loops, fill each polygon's loops with the even-odd rule, union the
/// polygons, then orient exteriors counter-clockwise and interiors clockwise.
/// A rebuild that loses all area is unreparable.
pub fn repair_multi_polygon(shape: &MultiPolygon<f64>) -> Repair<MultiPolygon<f64>> {
    if shape.0.is_empty() {
        return Repair {
            region: MultiPolygon::new(Vec::new()),
            status: RepairStatus::Valid,
        };
    }
    if !shape
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
    {
        return unreparable_multi_polygon();
    }
    if shape.is_valid() {
        return Repair {
            region: shape.orient(Direction::Default),
            status: RepairStatus::Valid,
        };
    }

    let cleaned = shape.remove_repeated_points();
    let filled: Vec<Polygon<f64>> = cleaned
        .0
        .iter()
        .flat_map(|poly| even_odd_fill(poly).0)
        .collect();
    let rebuilt = unary_union(filled.iter()).orient(Direction::Default);
    if rebuilt.is_valid() && rebuilt.unsigned_area() > 0.0 {
        Repair {
            region: rebuilt,
            status: RepairStatus::Fixed,
        }
    } else {
        unreparable_multi_polygon()
    }
}

fn unreparable_multi_polygon() -> Repair<MultiPolygon<f64>> {
    Repair {
        region: MultiPolygon::new(Vec::new()),
        status: RepairStatus::Unreparable,
    }
}

/// Area covered by an odd number of the polygon's rings.
fn even_odd_fill(poly: &Polygon<f64>) -> MultiPolygon<f64> {
    std::iter::once(poly.exterior())
        .chain(poly.interiors())
        .flat_map(simple_loops)
        .filter(|ring| !is_degenerate(ring))
        .map(|ring| Polygon::new(ring, Vec::new()).orient(Direction::Default))
        .fold(MultiPolygon::new(Vec::new()), |acc, part| {
            if acc.0.is_empty() {
                MultiPolygon::new(vec![part])
            } else {
                acc.xor(&part)
            }
        })
}

/// Split a ring at its self-intersections into loops that do not cross.
///
/// Crossing points are inserted as nodes into both segments, then the ring is
/// walked and a loop is cut off every time a node repeats.
fn simple_loops(ring: &LineString<f64>) -> Vec<LineString<f64>> {
    let mut vertices: Vec<Coord<f64>> = ring.0.clone();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    let n = vertices.len();
    if n < 3 {
        return Vec::new();
    }

    let segment = |i: usize| Line::new(vertices[i], vertices[(i + 1) % n]);
    let mut nodes: Vec<Vec<(f64, Coord<f64>)>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a, b) = (segment(i), segment(j));
            if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                line_intersection(a, b)
            {
                let at = Coord {
                    x: intersection.x + 0.0,
                    y: intersection.y + 0.0,
                };
                nodes[i].push((position_along(a, at), at));
                nodes[j].push((position_along(b, at), at));
            }
        }
    }

    let mut walk: Vec<Coord<f64>> = Vec::with_capacity(n * 2 + 1);
    for (i, vertex) in vertices.iter().enumerate() {
        walk.push(*vertex);
        let mut inserted = std::mem::take(&mut nodes[i]);
        inserted.sort_by(|a, b| a.0.total_cmp(&b.0));
        walk.extend(inserted.into_iter().map(|(_, c)| c));
    }
    walk.push(vertices[0]);

    let key = |c: &Coord<f64>| ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits());
    let mut loops = Vec::new();
    let mut path: Vec<Coord<f64>> = Vec::new();
    let mut seen: HashMap<(u64, u64), usize> = HashMap::new();
    for c in walk {
        if path.last().is_some_and(|last| key(last) == key(&c)) {
            continue;
        }
        match seen.get(&key(&c)).copied() {
            Some(start) => {
                let mut closed: Vec<Coord<f64>> = path.drain(start + 1..).collect();
                for dropped in &closed {
                    seen.remove(&key(dropped));
                }
                closed.insert(0, c);
                closed.push(c);
                loops.push(LineString::new(closed));
            }
            None => {
                seen.insert(key(&c), path.len());
                path.push(c);
            }
        }
    }
    loops
}

fn position_along(line: Line<f64>, at: Coord<f64>) -> f64 {
    let d = line.delta();
    let length2 = d.x * d.x + d.y * d.y;
    if length2 == 0.0 {
        return 0.0;
    }
    ((at.x - line.start.x) * d.x + (at.y - line.start.y) * d.y) / length2
}

// A closed ring needs three distinct vertices plus the closing one.
fn is_degenerate(ring: &LineString<f64>) -> bool {
    ring.0.len() < 4 || Polygon::new(ring.clone(), Vec::new()).unsigned_area() == 0.0
}
