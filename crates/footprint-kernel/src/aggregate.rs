//! Per-layer accumulation of claimed area.
//!
//! Areas are summed unrounded. Rounding to one decimal place happens exactly
//! once, in [`LayerAggregator::finalize`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One output row: a layer and its total claimed hectares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRow {
    pub layer: String,
    pub area_ha: f64,
}

/// The final table, ordered by first appearance of each layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationTable {
    pub rows: Vec<AllocationRow>,
}

impl AllocationTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, layer: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.layer == layer)
            .map(|row| row.area_ha)
    }

    pub fn total_ha(&self) -> f64 {
        self.rows.iter().map(|row| row.area_ha).sum()
    }

    /// Rows sorted by area, largest first; ties keep table order.
    pub fn by_area_desc(&self) -> Vec<&AllocationRow> {
        let mut rows: Vec<&AllocationRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.area_ha.total_cmp(&a.area_ha));
        rows
    }

    /// SHA-256 over the canonical rendering of the table.
    ///
    /// Equal digests mean byte-identical tables.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for row in &self.rows {
            hasher.update(row.layer.as_bytes());
            hasher.update(b"\t");
            hasher.update(format!("{:.1}", row.area_ha).as_bytes());
            hasher.update(b"\n");
        }
        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

/// Running totals keyed by layer, remembering first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LayerAggregator {
    index: BTreeMap<String, usize>,
    totals: Vec<(String, f64)>,
}

impl LayerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add unrounded hectares to a layer. A zero still registers the layer.
    pub fn add(&mut self, layer: &str, area_ha: f64) {
        match self.index.get(layer) {
            Some(&slot) => self.totals[slot].1 += area_ha,
            None => {
                self.index.insert(layer.to_string(), self.totals.len());
                self.totals.push((layer.to_string(), area_ha));
            }
        }
    }

    /// Unrounded running total for a layer.
    pub fn total(&self, layer: &str) -> Option<f64> {
        self.index.get(layer).map(|&slot| self.totals[slot].1)
    }

    pub fn finalize(self) -> AllocationTable {
        let rows = self
            .totals
            .into_iter()
            .map(|(layer, area_ha)| AllocationRow {
                layer,
                area_ha: round_one_decimal(area_ha),
            })
            .collect();
        AllocationTable { rows }
    }
}

/// Round half away from zero to one decimal place, never yielding `-0.0`.
pub fn round_one_decimal(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_seen_order() {
        let mut agg = LayerAggregator::new();
        agg.add("roads", 1.0);
        agg.add("water", 2.0);
        agg.add("roads", 3.0);
        let table = agg.finalize();
        let layers: Vec<&str> = table.rows.iter().map(|r| r.layer.as_str()).collect();
        assert_eq!(layers, vec!["roads", "water"]);
        assert_eq!(table.get("roads"), Some(4.0));
    }

    #[test]
    fn rounds_once_at_finalize() {
        // Rounding each addition would give 0.0 + 0.0 + 0.0.
        let mut agg = LayerAggregator::new();
        agg.add("a", 0.04);
        agg.add("a", 0.04);
        agg.add("a", 0.04);
        assert!((agg.total("a").unwrap() - 0.12).abs() < 1e-12);
        assert_eq!(agg.finalize().get("a"), Some(0.1));
    }

    #[test]
    fn zero_area_still_produces_a_row() {
        let mut agg = LayerAggregator::new();
        agg.add("empty", 0.0);
        let table = agg.finalize();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("empty"), Some(0.0));
    }

    #[test]
    fn rounding_never_yields_negative_zero() {
        assert!(round_one_decimal(-0.01).is_sign_positive());
        assert_eq!(round_one_decimal(49.99999), 50.0);
        assert_eq!(round_one_decimal(0.25), 0.3);
    }

    #[test]
    fn digest_tracks_content() {
        let mut a = LayerAggregator::new();
        a.add("x", 1.0);
        let mut b = LayerAggregator::new();
        b.add("x", 1.0);
        let mut c = LayerAggregator::new();
        c.add("x", 1.2);
        let (a, b, c) = (a.finalize(), b.finalize(), c.finalize());
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn sorts_by_area_for_display() {
        let mut agg = LayerAggregator::new();
        agg.add("small", 1.0);
        agg.add("large", 9.0);
        let table = agg.finalize();
        let order: Vec<&str> = table.by_area_desc().iter().map(|r| r.layer.as_str()).collect();
        assert_eq!(order, vec!["large", "small"]);
    }
}
