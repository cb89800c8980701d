//! The remaining master footprint and its claim transition.
//!
//! ```text
//!            claim drives area ≤ ε
//!   ACTIVE ─────────────────────────▶ EXHAUSTED ─┐
//!     ▲  │                                ▲      │ claim: no-op,
//!     └──┘ claim: area shrinks            └──────┘ zero area
//!          or stays
//! ```
//!
//! EXHAUSTED is absorbing. Once there, `claim` returns an empty region
//! without running any overlay.

use crate::error::KernelError;
use crate::geometry::Region;
use crate::repair::RepairStatus;
use serde::{Deserialize, Serialize};

/// Lifecycle state of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Active,
    Exhausted,
}

/// What happened to a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    /// Some area was taken from the remaining footprint.
    Claimed,
    /// The component did not overlap what remained.
    Disjoint,
    /// The tracker was already exhausted; no overlay ran.
    Exhausted,
    /// The component geometry could not be repaired.
    Unreparable,
}

/// Result of one claim. Never mutated after it is produced.
#[derive(Debug, Clone)]
pub struct Claim<R> {
    pub claimed: R,
    /// Claimed area in squared working-CRS units.
    pub area: f64,
    pub kind: ClaimKind,
    pub repair: RepairStatus,
}

impl<R: Region> Claim<R> {
    fn nothing(kind: ClaimKind, repair: RepairStatus) -> Self {
        Self {
            claimed: R::empty(),
            area: 0.0,
            kind,
            repair,
        }
    }

    /// Claimed area in hectares, unrounded.
    pub fn hectares(&self) -> f64 {
        self.area / 10_000.0
    }
}

/// Owner of the shrinking remaining footprint.
#[derive(Debug, Clone)]
pub struct FootprintTracker<R> {
    remaining: R,
    remaining_area: f64,
    initial_area: f64,
    epsilon: f64,
    claims: usize,
    master_repair: RepairStatus,
}

impl<R: Region> FootprintTracker<R> {
    /// Start from a master already expressed in the working CRS.
    ///
    /// The master is repaired, then its parts are dissolved into one region.
    /// An unreparable master starts the tracker empty, and therefore
    /// exhausted.
    pub fn new(master: &R, epsilon: f64) -> Result<Self, KernelError> {
        let repaired = master.repair();
        let master_repair = repaired.status;
        let remaining = repaired.into_region().dissolve()?;
        let area = remaining.area();
        Ok(Self {
            remaining,
            remaining_area: area,
            initial_area: area,
            epsilon,
            claims: 0,
            master_repair,
        })
    }

    pub fn state(&self) -> TrackerState {
        if self.remaining_area <= self.epsilon {
            TrackerState::Exhausted
        } else {
            TrackerState::Active
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state() == TrackerState::Exhausted
    }

    pub fn remaining(&self) -> &R {
        &self.remaining
    }

    pub fn remaining_area(&self) -> f64 {
        self.remaining_area
    }

    pub fn initial_area(&self) -> f64 {
        self.initial_area
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Number of claims processed so far, including no-op ones.
    pub fn claims(&self) -> usize {
        self.claims
    }

    pub fn master_repair(&self) -> RepairStatus {
        self.master_repair
    }

    /// Claim whatever part of `component` still remains.
    ///
    /// `claimed = repair(remaining ∩ repair(component))`, then
    /// `remaining = repair(remaining − claimed)`.
    pub fn claim(&mut self, component: &R) -> Result<Claim<R>, KernelError> {
        self.claims += 1;
        if self.is_exhausted() {
            return Ok(Claim::nothing(ClaimKind::Exhausted, RepairStatus::Valid));
        }

        let component = component.repair();
        if component.is_unreparable() {
            return Ok(Claim::nothing(ClaimKind::Unreparable, component.status));
        }
        let repair = component.status;

        let claimed = self
            .remaining
            .intersection(&component.region)?
            .repair()
            .into_region();
        let area = claimed.area();
        if claimed.is_empty() || area <= 0.0 {
            return Ok(Claim::nothing(ClaimKind::Disjoint, repair));
        }

        let next = self.remaining.difference(&claimed)?.repair().into_region();
        // Overlay noise must never grow the reported footprint.
        self.remaining_area = next.area().min(self.remaining_area);
        self.remaining = next;

        Ok(Claim {
            claimed,
            area,
            kind: ClaimKind::Claimed,
            repair,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planar::Planar;
    use geo::polygon;

    const EPS: f64 = 0.01;

    fn km_square() -> Planar {
        Planar::rect(0.0, 0.0, 1000.0, 1000.0)
    }

    #[test]
    fn starts_active_with_master_area() {
        let tracker = FootprintTracker::new(&km_square(), EPS).unwrap();
        assert_eq!(tracker.state(), TrackerState::Active);
        assert!((tracker.initial_area() - 1_000_000.0).abs() < 1e-6);
        assert_eq!(tracker.master_repair(), RepairStatus::Valid);
    }

    #[test]
    fn claim_takes_overlap_and_shrinks_remaining() {
        let mut tracker = FootprintTracker::new(&km_square(), EPS).unwrap();
        let claim = tracker
            .claim(&Planar::rect(-100.0, 0.0, 500.0, 1000.0))
            .unwrap();
        assert_eq!(claim.kind, ClaimKind::Claimed);
        assert!((claim.hectares() - 50.0).abs() < 1e-6);
        assert!((tracker.remaining_area() - 500_000.0).abs() < 1e-3);
    }

    #[test]
    fn disjoint_claim_leaves_remaining_untouched() {
        let mut tracker = FootprintTracker::new(&km_square(), EPS).unwrap();
        let before = tracker.remaining().clone();
        let claim = tracker
            .claim(&Planar::rect(2000.0, 0.0, 3000.0, 1000.0))
            .unwrap();
        assert_eq!(claim.kind, ClaimKind::Disjoint);
        assert_eq!(claim.area, 0.0);
        assert_eq!(tracker.remaining(), &before);
    }

    #[test]
    fn exhaustion_is_absorbing() {
        let mut tracker = FootprintTracker::new(&km_square(), EPS).unwrap();
        let full = tracker
            .claim(&Planar::rect(-1.0, -1.0, 1001.0, 1001.0))
            .unwrap();
        assert!((full.hectares() - 100.0).abs() < 1e-6);
        assert!(tracker.is_exhausted());

        let after = tracker.claim(&km_square()).unwrap();
        assert_eq!(after.kind, ClaimKind::Exhausted);
        assert_eq!(after.area, 0.0);
        assert!(after.claimed.is_empty());
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.claims(), 2);
    }

    #[test]
    fn epsilon_bounds_the_exhausted_state() {
        // Both runs leave a 1 m² strip behind.
        let rest = Planar::rect(0.0, 0.0, 1000.0, 999.999);

        let mut loose = FootprintTracker::new(&km_square(), 2.0).unwrap();
        loose.claim(&rest).unwrap();
        assert_eq!(loose.state(), TrackerState::Exhausted);

        let mut strict = FootprintTracker::new(&km_square(), 0.5).unwrap();
        strict.claim(&rest).unwrap();
        assert_eq!(strict.state(), TrackerState::Active);
        assert!((strict.remaining_area() - 1.0).abs() < 0.01);
    }

    #[test]
    fn unreparable_component_claims_nothing() {
        let mut tracker = FootprintTracker::new(&km_square(), EPS).unwrap();
        let broken = Planar::from(polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 10.0, y: 10.0),
        ]);
        let claim = tracker.claim(&broken).unwrap();
        assert_eq!(claim.kind, ClaimKind::Unreparable);
        assert_eq!(claim.area, 0.0);
        assert!((tracker.remaining_area() - 1_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn self_intersecting_component_claims_its_lobes() {
        let mut tracker = FootprintTracker::new(&Planar::rect(0.0, 0.0, 2.0, 2.0), EPS).unwrap();
        let bowtie = Planar::from(polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
        ]);
        let claim = tracker.claim(&bowtie).unwrap();
        assert_eq!(claim.kind, ClaimKind::Claimed);
        assert_eq!(claim.repair, RepairStatus::Fixed);
        assert!((claim.area - 2.0).abs() < 1e-6);
        assert!((tracker.remaining_area() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_multipart_master_starts_unreparable() {
        let master = Planar::new(geo::MultiPolygon::new(vec![
            polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0)],
            polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)],
        ]));
        let tracker = FootprintTracker::new(&master, EPS).unwrap();
        assert_eq!(tracker.master_repair(), RepairStatus::Unreparable);
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.initial_area(), 0.0);
    }

    #[test]
    fn empty_master_is_exhausted_from_the_start() {
        let mut tracker = FootprintTracker::new(&Planar::empty(), EPS).unwrap();
        assert!(tracker.is_exhausted());
        let claim = tracker.claim(&km_square()).unwrap();
        assert_eq!(claim.kind, ClaimKind::Exhausted);
    }
}
