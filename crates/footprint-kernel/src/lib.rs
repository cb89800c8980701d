//! # Footprint Kernel
//!
//! Sequential, order-sensitive allocation of a master footprint among
//! overlapping component geometries. Every unit of master area is attributed
//! to exactly one component: the first one, in processing order, that claims
//! it. Reported layer totals never exceed the master area.
//!
//! The crate performs no file I/O. Callers hand in a master geometry and an
//! ordered-or-unordered set of components, each tagged with its CRS.
//!
//! ## Architecture
//!
//! ```text
//! OrderingPolicy        ← processing sequence of components
//!     │
//! Allocator             ← the sequential fold over components
//!     ├── normalize     ← one equal-area working CRS for everything
//!     ├── Region::repair← validity repair before every overlay
//!     └── FootprintTracker ← shrinking remaining footprint, ACTIVE/EXHAUSTED
//!     │
//! LayerAggregator       ← per-layer sums, rounded once at finalize
//!     │
//! AllocationTable       ← ordered (layer, area_ha) rows
//! ```

pub mod aggregate;
pub mod allocate;
pub mod config;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod normalize;
pub mod ordering;
pub mod planar;
pub mod repair;
pub mod tracker;

pub use aggregate::{AllocationRow, AllocationTable, LayerAggregator};
pub use allocate::{AllocationOutcome, Allocator, ClaimRecord};
pub use config::AllocationConfig;
pub use crs::{Crs, CrsError};
pub use error::{AllocationError, KernelError};
pub use geometry::{Component, Geometry, Region};
pub use normalize::{Normalized, normalize, working_crs_for};
pub use ordering::{AsGiven, OrderingPolicy, PriorityOrder, ProcessingOrder, SourcePathOrder};
pub use planar::Planar;
pub use repair::{Repair, RepairStatus};
pub use tracker::{Claim, ClaimKind, FootprintTracker, TrackerState};
