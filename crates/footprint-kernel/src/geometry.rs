//! The geometry abstraction the allocation core is written against.
//!
//! ```text
//! Region          ← capability set of a kernel: area, overlay, repair, map
//!     │
//! Geometry<R>     ← a region tagged with the CRS it is expressed in
//!     │
//! Component<R>    ← a geometry competing for a layer
//! ```
//!
//! The allocation loop never touches a concrete kernel. [`crate::planar::Planar`]
//! is the `geo`-backed implementation used by default.

use crate::crs::{Crs, CrsError};
use crate::error::KernelError;
use crate::repair::Repair;
use std::fmt::Debug;

/// An areal region in a 2-D plane, possibly empty.
///
/// Overlay operations return new values; regions are never mutated.
pub trait Region: Clone + Debug + Sized {
    /// The empty region.
    fn empty() -> Self;

    /// Planar area in squared CRS units.
    fn area(&self) -> f64;

    /// Whether the region has no polygons.
    fn is_empty(&self) -> bool;

    /// Whether the region is topologically valid for overlay.
    fn is_valid(&self) -> bool;

    fn intersection(&self, other: &Self) -> Result<Self, KernelError>;

    fn difference(&self, other: &Self) -> Result<Self, KernelError>;

    fn union(&self, other: &Self) -> Result<Self, KernelError>;

    /// Union all parts of this region into one.
    fn dissolve(&self) -> Result<Self, KernelError>;

    /// Turn this region into a valid equivalent, or report it unreparable.
    fn repair(&self) -> Repair<Self>;

    /// Apply a fallible point transform to every vertex.
    fn try_map_points<E, F>(&self, f: F) -> Result<Self, E>
    where
        F: Fn(f64, f64) -> Result<(f64, f64), E>;
}

/// A region tagged with its coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry<R> {
    region: R,
    crs: Crs,
}

impl<R: Region> Geometry<R> {
    pub fn new(region: R, crs: Crs) -> Self {
        Self { region, crs }
    }

    pub fn empty(crs: Crs) -> Self {
        Self::new(R::empty(), crs)
    }

    pub fn region(&self) -> &R {
        &self.region
    }

    pub fn into_region(self) -> R {
        self.region
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn area(&self) -> f64 {
        self.region.area()
    }

    /// Express this geometry in `target`.
    ///
    /// Fails with [`CrsError::Unknown`] when either side is undeclared, even
    /// for an empty region.
    pub fn reproject(&self, target: &Crs) -> Result<Self, CrsError> {
        let transform = self.crs.transform_to(target)?;
        if transform.is_identity() {
            return Ok(Self::new(self.region.clone(), *target));
        }
        let region = self.region.try_map_points(|x, y| transform.apply(x, y))?;
        Ok(Self::new(region, *target))
    }
}

/// One input record competing for a share of the master footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Component<R> {
    /// Opaque layer key; several components may share it.
    pub layer: String,
    /// Stable identifier of where the geometry came from, used for ordering
    /// and diagnostics.
    pub source: String,
    pub geometry: Geometry<R>,
}

impl<R: Region> Component<R> {
    pub fn new(layer: impl Into<String>, source: impl Into<String>, geometry: Geometry<R>) -> Self {
        Self {
            layer: layer.into(),
            source: source.into(),
            geometry,
        }
    }
}
