//! Processing order of components.
//!
//! Allocation is order-sensitive: earlier components win overlaps. Every
//! policy here is a total order, so identical inputs reproduce identical
//! tables.

use crate::geometry::{Component, Region};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A strategy that arranges components into their processing sequence.
pub trait OrderingPolicy {
    fn order<R: Region>(&self, components: Vec<Component<R>>) -> Vec<Component<R>>;
}

/// Lexicographic by source path; ties keep their input order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcePathOrder;

impl OrderingPolicy for SourcePathOrder {
    fn order<R: Region>(&self, mut components: Vec<Component<R>>) -> Vec<Component<R>> {
        components.sort_by(|a, b| a.source.cmp(&b.source));
        components
    }
}

/// Keep the caller's order untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsGiven;

impl OrderingPolicy for AsGiven {
    fn order<R: Region>(&self, components: Vec<Component<R>>) -> Vec<Component<R>> {
        components
    }
}

/// Listed layers first, in list order; everything else afterwards.
///
/// Within one rank components are ordered by source path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityOrder {
    ranks: BTreeMap<String, usize>,
}

impl PriorityOrder {
    pub fn new<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = BTreeMap::new();
        for layer in layers {
            let next = ranks.len();
            ranks.entry(layer.into()).or_insert(next);
        }
        Self { ranks }
    }

    fn rank(&self, layer: &str) -> usize {
        self.ranks.get(layer).copied().unwrap_or(usize::MAX)
    }
}

impl OrderingPolicy for PriorityOrder {
    fn order<R: Region>(&self, mut components: Vec<Component<R>>) -> Vec<Component<R>> {
        components.sort_by(|a, b| {
            self.rank(&a.layer)
                .cmp(&self.rank(&b.layer))
                .then_with(|| a.source.cmp(&b.source))
        });
        components
    }
}

/// The built-in policies, selectable from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ProcessingOrder {
    #[default]
    SourcePath,
    AsGiven,
    Priority { layers: Vec<String> },
}

impl OrderingPolicy for ProcessingOrder {
    fn order<R: Region>(&self, components: Vec<Component<R>>) -> Vec<Component<R>> {
        match self {
            Self::SourcePath => SourcePathOrder.order(components),
            Self::AsGiven => AsGiven.order(components),
            Self::Priority { layers } => PriorityOrder::new(layers.iter().cloned()).order(components),
        }
    }
}
