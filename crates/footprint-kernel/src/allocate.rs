//! The sequential allocation run.
//!
//! ```text
//! order → normalize → FootprintTracker::new(master)
//!                          │
//!   fold over components:  ▼
//!     (tracker, aggregator) ── claim ──▶ (tracker', aggregator + area_ha)
//!                          │
//!                          ▼
//!               finalize → AllocationTable + residual
//! ```
//!
//! The tracker is threaded through the fold by value. Components are never
//! processed concurrently: each claim depends on everything before it.

use crate::aggregate::{AllocationTable, LayerAggregator};
use crate::config::{AllocationConfig, DEFAULT_EPSILON};
use crate::crs::Crs;
use crate::error::AllocationError;
use crate::geometry::{Component, Geometry, Region};
use crate::normalize::{Normalized, normalize};
use crate::ordering::{OrderingPolicy, ProcessingOrder};
use crate::repair::RepairStatus;
use crate::tracker::{ClaimKind, FootprintTracker};
use serde::Serialize;
use tracing::{debug, info, warn};

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// Per-component diagnostic, in processing order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub index: usize,
    pub source: String,
    pub layer: String,
    /// Unrounded claimed hectares.
    pub area_ha: f64,
    pub kind: ClaimKind,
    pub repair: RepairStatus,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome {
    pub table: AllocationTable,
    /// Unclaimed master area in hectares, unrounded. Never allocated.
    pub residual_ha: f64,
    /// Master area after dissolve and repair, in hectares.
    pub initial_ha: f64,
    pub working_crs: Crs,
    pub master_repair: RepairStatus,
    /// Whether the master ended the run exhausted.
    pub exhausted: bool,
    /// Index of the component whose claim exhausted the master. `None` when
    /// the master was never exhausted, or was exhausted before any claim
    /// (an empty or unreparable master).
    pub exhausted_after: Option<usize>,
    pub claims: Vec<ClaimRecord>,
}

impl AllocationOutcome {
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Drives the claim loop under a given ordering policy.
#[derive(Debug, Clone)]
pub struct Allocator<P = ProcessingOrder> {
    epsilon: f64,
    working_crs: Option<Crs>,
    policy: P,
}

impl Default for Allocator<ProcessingOrder> {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            working_crs: None,
            policy: ProcessingOrder::default(),
        }
    }
}

impl Allocator<ProcessingOrder> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AllocationConfig) -> Result<Self, AllocationError> {
        config.validate()?;
        Ok(Self {
            epsilon: config.epsilon,
            working_crs: config.working_crs_override()?,
            policy: config.ordering.clone(),
        })
    }
}

impl<P: OrderingPolicy> Allocator<P> {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_working_crs(mut self, crs: Crs) -> Self {
        self.working_crs = Some(crs);
        self
    }

    /// Replace the ordering policy.
    pub fn with_policy<Q: OrderingPolicy>(self, policy: Q) -> Allocator<Q> {
        Allocator {
            epsilon: self.epsilon,
            working_crs: self.working_crs,
            policy,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Allocate the master footprint among `components`.
    ///
    /// Fatal errors (unknown CRS, unsupported reprojection, overlay failure)
    /// abort the whole run; no partial table is returned.
    pub fn allocate<R: Region>(
        &self,
        master: &Geometry<R>,
        components: Vec<Component<R>>,
    ) -> Result<AllocationOutcome, AllocationError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(AllocationError::InvalidConfig(format!(
                "epsilon must be a finite, non-negative area, got {}",
                self.epsilon
            )));
        }

        let ordered = self.policy.order(components);
        let Normalized {
            master,
            components,
            working_crs,
        } = normalize(master, ordered, self.working_crs)?;

        let tracker = FootprintTracker::new(master.region(), self.epsilon)
            .map_err(|e| AllocationError::kernel("master footprint", e))?;
        if tracker.master_repair() == RepairStatus::Unreparable {
            warn!("master footprint geometry is unreparable; nothing can be allocated");
        }
        let initial_ha = tracker.initial_area() / SQUARE_METRES_PER_HECTARE;
        info!(
            working_crs = %working_crs,
            components = components.len(),
            master_ha = initial_ha,
            "starting allocation"
        );

        let run = components
            .iter()
            .enumerate()
            .try_fold(Run::new(tracker), |run, (index, component)| {
                run.step(index, component)
            })?;

        let residual_ha = run.tracker.remaining_area() / SQUARE_METRES_PER_HECTARE;
        let exhausted = run.tracker.is_exhausted();
        let master_repair = run.tracker.master_repair();
        let table = run.aggregator.finalize();
        info!(
            layers = table.len(),
            allocated_ha = table.total_ha(),
            residual_ha,
            "allocation finished"
        );

        Ok(AllocationOutcome {
            table,
            residual_ha,
            initial_ha,
            working_crs,
            master_repair,
            exhausted,
            exhausted_after: run.exhausted_after,
            claims: run.claims,
        })
    }
}

/// Fold accumulator: the only mutable state of a run.
struct Run<R> {
    tracker: FootprintTracker<R>,
    aggregator: LayerAggregator,
    claims: Vec<ClaimRecord>,
    exhausted_after: Option<usize>,
}

impl<R: Region> Run<R> {
    fn new(tracker: FootprintTracker<R>) -> Self {
        Self {
            tracker,
            aggregator: LayerAggregator::new(),
            claims: Vec::new(),
            exhausted_after: None,
        }
    }

    fn step(mut self, index: usize, component: &Component<R>) -> Result<Self, AllocationError> {
        let was_exhausted = self.tracker.is_exhausted();
        let claim = self
            .tracker
            .claim(component.geometry.region())
            .map_err(|e| AllocationError::kernel(format!("component `{}`", component.source), e))?;
        let area_ha = claim.area / SQUARE_METRES_PER_HECTARE;

        match claim.kind {
            ClaimKind::Unreparable => warn!(
                source = %component.source,
                layer = %component.layer,
                "component geometry is unreparable; counting 0.0 ha"
            ),
            ClaimKind::Exhausted => debug!(
                source = %component.source,
                layer = %component.layer,
                "master exhausted; skipping overlay"
            ),
            ClaimKind::Claimed | ClaimKind::Disjoint => debug!(
                source = %component.source,
                layer = %component.layer,
                area_ha,
                remaining_ha = self.tracker.remaining_area() / SQUARE_METRES_PER_HECTARE,
                "claimed"
            ),
        }

        if !was_exhausted && self.tracker.is_exhausted() {
            info!(
                source = %component.source,
                index,
                "master footprint exhausted; remaining components allocate 0.0 ha"
            );
            self.exhausted_after = Some(index);
        }

        self.aggregator.add(&component.layer, area_ha);
        self.claims.push(ClaimRecord {
            index,
            source: component.source.clone(),
            layer: component.layer.clone(),
            area_ha,
            kind: claim.kind,
            repair: claim.repair,
        });
        Ok(self)
    }
}
