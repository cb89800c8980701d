//! Job files: the master and components handed to the kernel.
//!
//! ```json
//! {
//!   "master": { "crs": "EPSG:4326", "geometry": { "type": "Polygon", "coordinates": [...] } },
//!   "components": [
//!     { "source": "roads/main.shp", "crs": "EPSG:4326", "geometry": { ... } },
//!     { "source": "water/lake.shp", "layer": "water", "crs": "EPSG:6933", "geometry": null }
//!   ]
//! }
//! ```
//!
//! A missing `crs` is kept as unknown so the kernel can reject it. A `null`
//! geometry is an empty component that still yields a 0.0 row.

use crate::cli::LayerNameArg;
use footprint_kernel::{Component, Crs, Geometry, Planar};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFile {
    pub master: MasterEntry,
    #[serde(default)]
    pub components: Vec<ComponentEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasterEntry {
    #[serde(default)]
    pub crs: Option<String>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentEntry {
    pub source: String,
    /// Explicit layer name; derived from `source` when absent.
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub crs: Option<String>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
}

type Ring = Vec<Vec<f64>>;

/// The GeoJSON geometry types an areal footprint can take.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum GeoJsonGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

/// Master and components converted into kernel types.
#[derive(Debug)]
pub struct LoadedJob {
    pub master: Geometry<Planar>,
    pub components: Vec<Component<Planar>>,
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("failed to read job file {}: {e}", path.display()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| format!("failed to parse job file {}: {e}", path.display()))
    }

    pub fn into_kernel(self, naming: LayerNameArg) -> Result<LoadedJob, String> {
        let master_crs = parse_crs(self.master.crs.as_deref(), "master footprint")?;
        let master_region = to_region(self.master.geometry.as_ref(), "master footprint")?;
        if master_region.polygons().is_empty() {
            return Err("master footprint is empty".to_string());
        }

        let components = self
            .components
            .into_iter()
            .map(|entry| {
                let subject = format!("component `{}`", entry.source);
                let crs = parse_crs(entry.crs.as_deref(), &subject)?;
                let region = to_region(entry.geometry.as_ref(), &subject)?;
                let layer = entry
                    .layer
                    .unwrap_or_else(|| layer_name(&entry.source, naming));
                Ok(Component::new(layer, entry.source, Geometry::new(region, crs)))
            })
            .collect::<Result<Vec<_>, String>>()?;

        Ok(LoadedJob {
            master: Geometry::new(master_region, master_crs),
            components,
        })
    }
}

/// Derive a layer name from a component source path.
///
/// Falls back to the file stem when the source has no parent directory.
pub fn layer_name(source: &str, naming: LayerNameArg) -> String {
    let path = Path::new(source);
    let stem = || {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string())
    };
    match naming {
        LayerNameArg::Filename => stem(),
        LayerNameArg::ParentFolder => path
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(stem),
    }
}

fn parse_crs(raw: Option<&str>, subject: &str) -> Result<Crs, String> {
    match raw {
        None => Ok(Crs::Unknown),
        Some(text) => text
            .parse()
            .map_err(|e| format!("{subject}: {e}")),
    }
}

fn to_region(geometry: Option<&GeoJsonGeometry>, subject: &str) -> Result<Planar, String> {
    let polygons = match geometry {
        None => Vec::new(),
        Some(GeoJsonGeometry::Polygon(rings)) => vec![to_polygon(rings, subject)?],
        Some(GeoJsonGeometry::MultiPolygon(parts)) => parts
            .iter()
            .filter(|rings| !rings.is_empty())
            .map(|rings| to_polygon(rings, subject))
            .collect::<Result<Vec<_>, String>>()?,
    };
    Ok(Planar::new(MultiPolygon::new(polygons)))
}

fn to_polygon(rings: &[Ring], subject: &str) -> Result<Polygon<f64>, String> {
    let mut rings = rings
        .iter()
        .map(|ring| to_ring(ring, subject))
        .collect::<Result<Vec<_>, String>>()?
        .into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| format!("{subject}: polygon has no exterior ring"))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn to_ring(positions: &[Vec<f64>], subject: &str) -> Result<LineString<f64>, String> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(format!(
                "{subject}: position needs at least two numbers, got {}",
                position.len()
            )),
        })
        .collect::<Result<Vec<_>, String>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_kernel::Region;

    #[test]
    fn layer_names_follow_policy() {
        assert_eq!(layer_name("data/roads/main.shp", LayerNameArg::ParentFolder), "roads");
        assert_eq!(layer_name("data/roads/main.shp", LayerNameArg::Filename), "main");
        assert_eq!(layer_name("lake.shp", LayerNameArg::ParentFolder), "lake");
    }

    #[test]
    fn converts_geojson_polygons() {
        let job: JobFile = serde_json::from_str(
            r#"{
                "master": {
                    "crs": "EPSG:32633",
                    "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}
                },
                "components": [
                    {"source": "a/x.shp", "crs": "EPSG:32633",
                     "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,0,5],[5,0,5],[5,5,5],[0,0,5]]]]}},
                    {"source": "b/y.shp", "layer": "custom", "geometry": null}
                ]
            }"#,
        )
        .unwrap();
        let loaded = job.into_kernel(LayerNameArg::ParentFolder).unwrap();
        assert_eq!(loaded.master.crs(), Crs::Projected { epsg: 32633 });
        assert_eq!(loaded.master.area(), 100.0);
        assert_eq!(loaded.components[0].layer, "a");
        assert_eq!(loaded.components[0].geometry.area(), 12.5);
        assert_eq!(loaded.components[1].layer, "custom");
        assert_eq!(loaded.components[1].geometry.crs(), Crs::Unknown);
        assert!(loaded.components[1].geometry.region().is_empty());
    }

    #[test]
    fn empty_master_is_rejected() {
        let job: JobFile =
            serde_json::from_str(r#"{"master": {"crs": "EPSG:4326", "geometry": null}}"#).unwrap();
        let err = job.into_kernel(LayerNameArg::ParentFolder).unwrap_err();
        assert_eq!(err, "master footprint is empty");
    }

    #[test]
    fn short_positions_are_rejected() {
        let job: JobFile = serde_json::from_str(
            r#"{"master": {"crs": "EPSG:4326",
                "geometry": {"type": "Polygon", "coordinates": [[[0],[1,1],[0,1]]]}}}"#,
        )
        .unwrap();
        let err = job.into_kernel(LayerNameArg::ParentFolder).unwrap_err();
        assert!(err.contains("at least two numbers"), "{err}");
    }
}
