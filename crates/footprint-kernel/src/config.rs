//! Allocation configuration.
//!
//! ```toml
//! epsilon = 0.01            # m², exhaustion tolerance
//! working_crs = "EPSG:6933" # optional override
//!
//! [ordering]
//! strategy = "priority"     # source_path | as_given | priority
//! layers = ["water", "roads"]
//! ```

use crate::crs::Crs;
use crate::error::AllocationError;
use crate::ordering::ProcessingOrder;
use serde::{Deserialize, Serialize};

/// Default exhaustion tolerance in square metres.
pub const DEFAULT_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocationConfig {
    /// Remaining area at or below which the master counts as exhausted.
    pub epsilon: f64,
    /// Projected CRS to use instead of the master-derived one.
    pub working_crs: Option<String>,
    pub ordering: ProcessingOrder,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            working_crs: None,
            ordering: ProcessingOrder::default(),
        }
    }
}

impl AllocationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, AllocationError> {
        let config: Self =
            toml::from_str(text).map_err(|e| AllocationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AllocationError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(AllocationError::InvalidConfig(format!(
                "epsilon must be a finite, non-negative area, got {}",
                self.epsilon
            )));
        }
        self.working_crs_override()?;
        Ok(())
    }

    /// Parsed working CRS override, if one is configured.
    pub fn working_crs_override(&self) -> Result<Option<Crs>, AllocationError> {
        let Some(raw) = self.working_crs.as_deref() else {
            return Ok(None);
        };
        let crs: Crs = raw
            .parse()
            .map_err(|e| AllocationError::InvalidConfig(format!("working_crs: {e}")))?;
        match crs {
            Crs::Projected { .. } => Ok(Some(crs)),
            _ => Err(AllocationError::InvalidConfig(format!(
                "working_crs `{raw}` must be a projected system"
            ))),
        }
    }
}
