//! Bring master and components into one area-preserving working CRS.
//!
//! The working CRS depends only on the master (or an explicit override):
//! a geographic master selects EPSG:6933, a projected master keeps its own
//! system. No overlay ever sees two different systems.

use crate::crs::Crs;
use crate::error::AllocationError;
use crate::geometry::{Component, Geometry, Region};

/// Master and components, all expressed in `working_crs`.
#[derive(Debug, Clone)]
pub struct Normalized<R> {
    pub master: Geometry<R>,
    pub components: Vec<Component<R>>,
    pub working_crs: Crs,
}

/// Pick the working CRS for a master.
pub fn working_crs_for(master: &Crs, override_crs: Option<Crs>) -> Result<Crs, AllocationError> {
    if let Some(crs) = override_crs {
        return match crs {
            Crs::Projected { .. } => Ok(crs),
            Crs::Geographic { .. } => Err(AllocationError::InvalidConfig(format!(
                "working CRS override {crs} is geographic; areas need a projected system"
            ))),
            Crs::Unknown => Err(AllocationError::InvalidConfig(
                "working CRS override is unknown".to_string(),
            )),
        };
    }
    match master {
        Crs::Unknown => Err(AllocationError::UnknownCrs {
            subject: "master footprint".to_string(),
        }),
        Crs::Geographic { .. } => Ok(Crs::equal_area()),
        Crs::Projected { .. } => Ok(*master),
    }
}

/// Reproject the master and every component into the working CRS.
///
/// Every CRS is checked before any geometry work, so an unknown system on the
/// last component still aborts the run up front.
pub fn normalize<R: Region>(
    master: &Geometry<R>,
    components: Vec<Component<R>>,
    override_crs: Option<Crs>,
) -> Result<Normalized<R>, AllocationError> {
    if !master.crs().is_known() {
        return Err(AllocationError::UnknownCrs {
            subject: "master footprint".to_string(),
        });
    }
    if let Some(unknown) = components.iter().find(|c| !c.geometry.crs().is_known()) {
        return Err(AllocationError::UnknownCrs {
            subject: format!("component `{}`", unknown.source),
        });
    }

    let working_crs = working_crs_for(&master.crs(), override_crs)?;
    let master = master
        .reproject(&working_crs)
        .map_err(|e| AllocationError::reproject("master footprint", e))?;

    let components = components
        .into_iter()
        .map(|component| {
            let geometry = component
                .geometry
                .reproject(&working_crs)
                .map_err(|e| AllocationError::reproject(format!("component `{}`", component.source), e))?;
            Ok(Component { geometry, ..component })
        })
        .collect::<Result<Vec<_>, AllocationError>>()?;

    Ok(Normalized {
        master,
        components,
        working_crs,
    })
}
