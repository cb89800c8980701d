//! Error types for footprint allocation runs.

use crate::crs::CrsError;

/// A failure inside the geometry kernel while computing an overlay.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{operation} failed: {detail}")]
pub struct KernelError {
    pub operation: &'static str,
    pub detail: String,
}

impl KernelError {
    pub fn new(operation: &'static str, detail: impl Into<String>) -> Self {
        Self {
            operation,
            detail: detail.into(),
        }
    }
}

/// Fatal errors that abort an allocation run.
///
/// Recoverable conditions (unreparable geometry, an exhausted master) are
/// reported in the outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// The master or a component carries no coordinate reference system.
    #[error("{subject} has no coordinate reference system defined")]
    UnknownCrs { subject: String },

    /// Reprojection into the working CRS failed.
    #[error("cannot reproject {subject}: {source}")]
    Reproject {
        subject: String,
        #[source]
        source: CrsError,
    },

    /// An overlay operation failed while processing a component.
    #[error("geometry kernel failure on {subject}: {source}")]
    Kernel {
        subject: String,
        #[source]
        source: KernelError,
    },

    /// The allocation configuration is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AllocationError {
    pub(crate) fn reproject(subject: impl Into<String>, source: CrsError) -> Self {
        let subject = subject.into();
        match source {
            CrsError::Unknown => Self::UnknownCrs { subject },
            source => Self::Reproject { subject, source },
        }
    }

    pub(crate) fn kernel(subject: impl Into<String>, source: KernelError) -> Self {
        Self::Kernel {
            subject: subject.into(),
            source,
        }
    }
}
