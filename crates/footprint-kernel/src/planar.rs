//! The `geo`-backed planar kernel.

use crate::error::KernelError;
use crate::geometry::Region;
use crate::repair::{Repair, repair_multi_polygon};
use geo::{Area, BooleanOps, Coord, CoordsIter, MapCoords, MultiPolygon, Polygon, Rect, unary_union};

/// A planar region backed by a `geo` multipolygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Planar(pub MultiPolygon<f64>);

impl Planar {
    pub fn new(shape: MultiPolygon<f64>) -> Self {
        Self(shape)
    }

    /// Axis-aligned rectangle between two corners.
    pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let rect = Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 });
        Self(MultiPolygon::new(vec![rect.to_polygon()]))
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.0.0
    }

    fn non_finite_vertex(&self) -> Option<Coord<f64>> {
        self.0
            .coords_iter()
            .find(|c| !c.x.is_finite() || !c.y.is_finite())
    }

    /// Overlay inputs must be finite; `geo` panics on NaN ordinates.
    fn ensure_finite(&self, operation: &'static str) -> Result<(), KernelError> {
        match self.non_finite_vertex() {
            Some(c) => Err(KernelError::new(
                operation,
                format!("non-finite vertex ({}, {}) in input", c.x, c.y),
            )),
            None => Ok(()),
        }
    }

    fn checked(operation: &'static str, shape: MultiPolygon<f64>) -> Result<Self, KernelError> {
        let result = Self(shape);
        match result.non_finite_vertex() {
            Some(c) => Err(KernelError::new(
                operation,
                format!("non-finite vertex ({}, {}) in result", c.x, c.y),
            )),
            None => Ok(result),
        }
    }
}

impl Default for Planar {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Polygon<f64>> for Planar {
    fn from(polygon: Polygon<f64>) -> Self {
        Self(MultiPolygon::new(vec![polygon]))
    }
}

impl From<MultiPolygon<f64>> for Planar {
    fn from(shape: MultiPolygon<f64>) -> Self {
        Self(shape)
    }
}

impl Region for Planar {
    fn empty() -> Self {
        Self(MultiPolygon::new(Vec::new()))
    }

    fn area(&self) -> f64 {
        self.0.unsigned_area()
    }

    fn is_empty(&self) -> bool {
        self.0.0.is_empty()
    }

    fn is_valid(&self) -> bool {
        geo::Validation::is_valid(&self.0)
    }

    fn intersection(&self, other: &Self) -> Result<Self, KernelError> {
        if self.is_empty() || other.is_empty() {
            return Ok(Self::empty());
        }
        self.ensure_finite("intersection")?;
        other.ensure_finite("intersection")?;
        Self::checked("intersection", self.0.intersection(&other.0))
    }

    fn difference(&self, other: &Self) -> Result<Self, KernelError> {
        if self.is_empty() || other.is_empty() {
            return Ok(self.clone());
        }
        self.ensure_finite("difference")?;
        other.ensure_finite("difference")?;
        Self::checked("difference", self.0.difference(&other.0))
    }

    fn union(&self, other: &Self) -> Result<Self, KernelError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        self.ensure_finite("union")?;
        other.ensure_finite("union")?;
        Self::checked("union", self.0.union(&other.0))
    }

    fn dissolve(&self) -> Result<Self, KernelError> {
        if self.0.0.len() < 2 {
            return Ok(self.clone());
        }
        self.ensure_finite("dissolve")?;
        Self::checked("dissolve", unary_union(self.0.0.iter()))
    }

    fn repair(&self) -> Repair<Self> {
        repair_multi_polygon(&self.0).map(Self)
    }

    fn try_map_points<E, F>(&self, f: F) -> Result<Self, E>
    where
        F: Fn(f64, f64) -> Result<(f64, f64), E>,
    {
        let f = &f;
        self.0
            .try_map_coords(|c| f(c.x, c.y).map(|(x, y)| Coord { x, y }))
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn rect_area_is_width_times_height() {
        assert_eq!(Planar::rect(0.0, 0.0, 1000.0, 500.0).area(), 500_000.0);
        assert!(Planar::empty().is_empty());
        assert_eq!(Planar::empty().area(), 0.0);
    }

    #[test]
    fn overlay_of_half_overlapping_squares() {
        let a = Planar::rect(0.0, 0.0, 2.0, 2.0);
        let b = Planar::rect(1.0, 0.0, 3.0, 2.0);
        assert!((a.intersection(&b).unwrap().area() - 2.0).abs() < 1e-9);
        assert!((a.difference(&b).unwrap().area() - 2.0).abs() < 1e-9);
        assert!((a.union(&b).unwrap().area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Planar::rect(0.0, 0.0, 1.0, 1.0);
        let b = Planar::rect(5.0, 5.0, 6.0, 6.0);
        let claimed = a.intersection(&b).unwrap();
        assert!(claimed.area() <= 1e-12);
    }

    #[test]
    fn dissolve_merges_adjacent_parts() {
        let parts = Planar::new(MultiPolygon::new(vec![
            Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }).to_polygon(),
            Rect::new(Coord { x: 0.5, y: 0.0 }, Coord { x: 2.0, y: 1.0 }).to_polygon(),
        ]));
        let dissolved = parts.dissolve().unwrap();
        assert!((dissolved.area() - 2.0).abs() < 1e-9);
        assert!(dissolved.is_valid());
    }

    #[test]
    fn map_points_propagates_errors() {
        let square = Planar::rect(0.0, 0.0, 1.0, 1.0);
        let shifted = square
            .try_map_points(|x, y| Ok::<_, ()>((x + 10.0, y)))
            .unwrap();
        assert!((shifted.area() - 1.0).abs() < 1e-12);
        assert!(square.try_map_points(|_, _| Err::<(f64, f64), _>("nope")).is_err());
    }

    #[test]
    fn overlays_reject_non_finite_input() {
        let broken = Planar::new(MultiPolygon::new(vec![
            polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0)],
            polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)],
        ]));
        let square = Planar::rect(0.0, 0.0, 1.0, 1.0);
        let err = broken.dissolve().unwrap_err();
        assert_eq!(err.operation, "dissolve");
        assert!(square.intersection(&broken).is_err());
        assert!(broken.difference(&square).is_err());
        assert!(square.union(&broken).is_err());
    }
}
