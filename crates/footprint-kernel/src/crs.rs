//! Coordinate reference systems and the transforms between them.
//!
//! Only three shapes of CRS are distinguished, because that is all the
//! allocation core needs to know. EPSG codes are classified through the
//! `crs-definitions` registry; a code the registry does not know is rejected
//! rather than guessed.
//!
//! - **Geographic**: angular longitude/latitude in degrees. Area is not
//!   meaningful here.
//! - **Projected**: planar coordinates in metres.
//! - **Unknown**: no CRS was declared. Never silently accepted.
//!
//! The canonical working system for geographic input is EPSG:6933
//! (WGS 84 / NSIDC EASE-Grid 2.0 Global), a Lambert cylindrical equal-area
//! projection on the WGS 84 ellipsoid with standard parallel 30°. It is
//! computed in closed form; every other transform goes through `proj4rs`.

use proj4rs::proj::Proj;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// EPSG code of the global cylindrical equal-area projection.
pub const EASE_GRID_2_GLOBAL: u32 = 6933;

const WGS84_CODE: u32 = 4326;
const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

// WGS 84 ellipsoid.
const SEMI_MAJOR: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
const STANDARD_PARALLEL_DEG: f64 = 30.0;

/// Errors from parsing a CRS identifier or transforming between systems.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CrsError {
    /// The identifier is not of the form `EPSG:<code>`.
    #[error("unrecognised CRS identifier `{0}`")]
    Parse(String),

    /// The EPSG code is not in the CRS registry.
    #[error("EPSG:{0} is not in the CRS registry")]
    Unregistered(u32),

    /// A transform was requested from or to an undeclared CRS.
    #[error("coordinate reference system is unknown")]
    Unknown,

    /// No transform between the two systems is available.
    #[error("no transform available from {from} to {to}")]
    UnsupportedTransform { from: Crs, to: Crs },

    /// The transform engine rejected a coordinate.
    #[error("transform from {from} to {to} failed: {detail}")]
    Transform { from: Crs, to: Crs, detail: String },

    /// A coordinate lies outside the domain of the transform.
    #[error("coordinate ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain { crs: Crs, x: f64, y: f64 },
}

/// A coordinate reference system, as far as area computation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Crs {
    /// Longitude/latitude in degrees.
    Geographic { epsg: u32 },
    /// Planar coordinates in metres.
    Projected { epsg: u32 },
    /// No CRS was declared.
    Unknown,
}

impl Crs {
    /// Classify an EPSG code through the CRS registry.
    ///
    /// A definition with `+proj=longlat` is geographic; any other registered
    /// definition is projected.
    pub fn from_epsg(epsg: u32) -> Result<Self, CrsError> {
        match epsg {
            WGS84_CODE => return Ok(Self::wgs84()),
            EASE_GRID_2_GLOBAL => return Ok(Self::equal_area()),
            _ => {}
        }
        let definition = registry_definition(epsg).ok_or(CrsError::Unregistered(epsg))?;
        if is_longlat(definition) {
            Ok(Self::Geographic { epsg })
        } else {
            Ok(Self::Projected { epsg })
        }
    }

    /// WGS 84 longitude/latitude.
    pub const fn wgs84() -> Self {
        Self::Geographic { epsg: WGS84_CODE }
    }

    /// The global cylindrical equal-area system (EPSG:6933).
    pub const fn equal_area() -> Self {
        Self::Projected {
            epsg: EASE_GRID_2_GLOBAL,
        }
    }

    pub fn epsg(&self) -> Option<u32> {
        match self {
            Self::Geographic { epsg } | Self::Projected { epsg } => Some(*epsg),
            Self::Unknown => None,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Self::Geographic { .. })
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    fn is_equal_area(&self) -> bool {
        *self == Self::equal_area()
    }

    /// Resolve the transform from `self` into `target`.
    ///
    /// EPSG:6933 is reached through WGS 84 and the closed-form projection;
    /// everything else is a single `proj4rs` step between registry
    /// definitions.
    pub fn transform_to(&self, target: &Crs) -> Result<Transform, CrsError> {
        if !self.is_known() || !target.is_known() {
            return Err(CrsError::Unknown);
        }
        if self == target {
            return Ok(Transform::identity());
        }
        let wgs84 = Crs::wgs84();
        let mut steps = Vec::new();
        if self.is_equal_area() {
            steps.push(Step::FromEqualArea(EqualArea::wgs84()));
            if *target != wgs84 {
                steps.push(Step::Proj(ProjStep::new(wgs84, *target)?));
            }
        } else if target.is_equal_area() {
            if *self != wgs84 {
                steps.push(Step::Proj(ProjStep::new(*self, wgs84)?));
            }
            steps.push(Step::ToEqualArea(EqualArea::wgs84()));
        } else {
            steps.push(Step::Proj(ProjStep::new(*self, *target)?));
        }
        Ok(Transform { steps })
    }
}

fn registry_definition(epsg: u32) -> Option<&'static str> {
    let code = u16::try_from(epsg).ok()?;
    crs_definitions::from_code(code).map(|def| def.proj4)
}

fn is_longlat(definition: &str) -> bool {
    definition
        .split_whitespace()
        .any(|token| matches!(token, "+proj=longlat" | "+proj=latlong" | "+proj=lonlat"))
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{code}"),
            None => f.write_str("unknown"),
        }
    }
}

impl FromStr for Crs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
            return Ok(Self::Unknown);
        }
        let code = trimmed
            .split_once(':')
            .filter(|(authority, _)| authority.eq_ignore_ascii_case("epsg"))
            .map(|(_, code)| code)
            .unwrap_or(trimmed);
        let code = code
            .parse::<u32>()
            .map_err(|_| CrsError::Parse(s.to_string()))?;
        Self::from_epsg(code)
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            Some(text) => text.parse().map_err(serde::de::Error::custom),
            None => Ok(Self::Unknown),
        }
    }
}

/// A resolved point transform between two systems, applied step by step.
#[derive(Debug)]
pub struct Transform {
    steps: Vec<Step>,
}

#[derive(Debug)]
enum Step {
    ToEqualArea(EqualArea),
    FromEqualArea(EqualArea),
    Proj(ProjStep),
}

impl Transform {
    pub fn identity() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn apply(&self, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
        self.steps
            .iter()
            .try_fold((x, y), |(x, y), step| match step {
                Step::ToEqualArea(proj) => proj.forward(x, y),
                Step::FromEqualArea(proj) => proj.inverse(x, y),
                Step::Proj(proj) => proj.apply(x, y),
            })
    }
}

/// A `proj4rs` transform between two registry definitions.
///
/// Geographic ends are in degrees here and radians inside `proj4rs`.
struct ProjStep {
    from: Crs,
    to: Crs,
    source: Proj,
    target: Proj,
}

impl ProjStep {
    fn new(from: Crs, to: Crs) -> Result<Self, CrsError> {
        let unsupported = || CrsError::UnsupportedTransform { from, to };
        let source = proj_definition(from).ok_or_else(unsupported)?;
        let target = proj_definition(to).ok_or_else(unsupported)?;
        Ok(Self {
            from,
            to,
            source,
            target,
        })
    }

    fn apply(&self, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(CrsError::OutOfDomain {
                crs: self.from,
                x,
                y,
            });
        }
        let mut point = if self.from.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        proj4rs::transform::transform(&self.source, &self.target, &mut point).map_err(|e| {
            CrsError::Transform {
                from: self.from,
                to: self.to,
                detail: e.to_string(),
            }
        })?;
        let (px, py, _) = point;
        let out = if self.to.is_geographic() {
            (px.to_degrees(), py.to_degrees())
        } else {
            (px, py)
        };
        if !out.0.is_finite() || !out.1.is_finite() {
            return Err(CrsError::OutOfDomain {
                crs: self.from,
                x,
                y,
            });
        }
        Ok(out)
    }
}

impl fmt::Debug for ProjStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjStep({} -> {})", self.from, self.to)
    }
}

fn proj_definition(crs: Crs) -> Option<Proj> {
    let definition = match crs {
        Crs::Geographic {
            epsg: WGS84_CODE,
        } => WGS84_PROJ,
        other => registry_definition(other.epsg()?)?,
    };
    Proj::from_proj_string(definition).ok()
}

/// Ellipsoidal Lambert cylindrical equal-area projection (normal aspect).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualArea {
    a: f64,
    e: f64,
    e2: f64,
    k0: f64,
    qp: f64,
}

impl EqualArea {
    /// EASE-Grid 2.0 parameters: WGS 84, standard parallel 30°, λ0 = 0.
    pub fn wgs84() -> Self {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let e = e2.sqrt();
        let phi1 = STANDARD_PARALLEL_DEG.to_radians();
        let k0 = phi1.cos() / (1.0 - e2 * phi1.sin().powi(2)).sqrt();
        let mut proj = Self {
            a: SEMI_MAJOR,
            e,
            e2,
            k0,
            qp: 0.0,
        };
        proj.qp = proj.q(1.0);
        proj
    }

    fn q(&self, sin_phi: f64) -> f64 {
        let es = self.e * sin_phi;
        (1.0 - self.e2)
            * (sin_phi / (1.0 - es * es) - (1.0 / (2.0 * self.e)) * ((1.0 - es) / (1.0 + es)).ln())
    }

    /// Degrees (lon, lat) to metres (x, y).
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), CrsError> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return Err(CrsError::OutOfDomain {
                crs: Crs::wgs84(),
                x: lon,
                y: lat,
            });
        }
        let x = self.a * self.k0 * lon.to_radians();
        let y = self.a * self.q(lat.to_radians().sin()) / (2.0 * self.k0);
        Ok((x, y))
    }

    /// Metres (x, y) to degrees (lon, lat).
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
        let ratio = 2.0 * y * self.k0 / (self.a * self.qp);
        if !x.is_finite() || !y.is_finite() || ratio.abs() > 1.0 + 1e-12 {
            return Err(CrsError::OutOfDomain {
                crs: Crs::equal_area(),
                x,
                y,
            });
        }
        let beta = ratio.clamp(-1.0, 1.0).asin();
        let e4 = self.e2 * self.e2;
        let e6 = e4 * self.e2;
        let phi = beta
            + (self.e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
            + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
            + (761.0 * e6 / 45360.0) * (6.0 * beta).sin();
        let lon = (x / (self.a * self.k0)).to_degrees();
        Ok((lon, phi.to_degrees()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_epsg_identifiers() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::wgs84());
        assert_eq!("epsg:6933".parse::<Crs>().unwrap(), Crs::equal_area());
        assert_eq!(
            "32633".parse::<Crs>().unwrap(),
            Crs::Projected { epsg: 32633 }
        );
        assert_eq!("".parse::<Crs>().unwrap(), Crs::Unknown);
        assert!(matches!(
            "ESRI:nope".parse::<Crs>(),
            Err(CrsError::Parse(_))
        ));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let crs = Crs::Projected { epsg: 3035 };
        assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        assert_eq!(Crs::Unknown.to_string(), "unknown");
    }

    #[test]
    fn unknown_crs_has_no_transform() {
        assert!(matches!(
            Crs::Unknown.transform_to(&Crs::equal_area()),
            Err(CrsError::Unknown)
        ));
        assert!(matches!(
            Crs::wgs84().transform_to(&Crs::Unknown),
            Err(CrsError::Unknown)
        ));
    }

    #[test]
    fn geographic_codes_come_from_the_registry() {
        // ED50, WGS 72 and OSGB36 are all angular systems.
        for code in [4230, 4322, 4277] {
            assert_eq!(
                Crs::from_epsg(code).unwrap(),
                Crs::Geographic { epsg: code },
                "EPSG:{code}"
            );
        }
        assert_eq!(
            Crs::from_epsg(3035).unwrap(),
            Crs::Projected { epsg: 3035 }
        );
    }

    #[test]
    fn unregistered_codes_are_rejected() {
        assert_eq!(Crs::from_epsg(999_999), Err(CrsError::Unregistered(999_999)));
        assert!(matches!(
            "EPSG:999999".parse::<Crs>(),
            Err(CrsError::Unregistered(999_999))
        ));
    }

    #[test]
    fn geographic_to_utm_goes_through_proj() {
        let utm = Crs::Projected { epsg: 32633 };
        let transform = Crs::wgs84().transform_to(&utm).unwrap();
        assert!(!transform.is_identity());
        // The central meridian of zone 33 on the equator.
        let (x, y) = transform.apply(15.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3, "x = {x}");
        assert!(y.abs() < 1e-3, "y = {y}");

        let back = utm.transform_to(&Crs::wgs84()).unwrap();
        let (lon, lat) = back.apply(x, 1_000_000.0).unwrap();
        assert!((lon - 15.0).abs() < 1e-9, "lon = {lon}");
        assert!(lat > 8.0 && lat < 10.0, "lat = {lat}");
    }

    #[test]
    fn projected_to_equal_area_chains_through_wgs84() {
        let utm = Crs::Projected { epsg: 32633 };
        let transform = utm.transform_to(&Crs::equal_area()).unwrap();
        let (x, y) = transform.apply(500_000.0, 0.0).unwrap();
        let (ex, ey) = EqualArea::wgs84().forward(15.0, 0.0).unwrap();
        assert!((x - ex).abs() < 1e-3 && (y - ey).abs() < 1e-3);
        assert!(utm.transform_to(&utm).unwrap().is_identity());
    }

    #[test]
    fn unregistered_projected_pair_is_unsupported() {
        let custom = Crs::Projected { epsg: 999_999 };
        assert!(matches!(
            custom.transform_to(&Crs::equal_area()),
            Err(CrsError::UnsupportedTransform { .. })
        ));
    }

    #[test]
    fn forward_matches_reference_points() {
        let proj = EqualArea::wgs84();
        let (x, y) = proj.forward(0.0, 0.0).unwrap();
        assert!(x.abs() < 1e-9 && y.abs() < 1e-9);

        // EASE-Grid 2.0 global extent: x = ±17367530.45 m at λ = ±180°.
        let (x, _) = proj.forward(180.0, 0.0).unwrap();
        assert!((x - 17_367_530.45).abs() < 0.5, "x = {x}");

        let (_, y) = proj.forward(0.0, 90.0).unwrap();
        assert!((y - 7_342_230.14).abs() < 0.5, "y = {y}");
    }

    #[test]
    fn inverse_recovers_geographic_coordinates() {
        let proj = EqualArea::wgs84();
        for &(lon, lat) in &[(12.5, 41.9), (-73.98, 40.75), (151.2, -33.87), (0.0, 85.0)] {
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-9, "lon {lon} -> {lon2}");
            assert!((lat - lat2).abs() < 1e-6, "lat {lat} -> {lat2}");
        }
    }

    #[test]
    fn rejects_latitudes_beyond_the_poles() {
        let proj = EqualArea::wgs84();
        assert!(matches!(
            proj.forward(10.0, 91.0),
            Err(CrsError::OutOfDomain { .. })
        ));
        assert!(proj.forward(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn serde_uses_epsg_strings() {
        let json = serde_json::to_string(&Crs::equal_area()).unwrap();
        assert_eq!(json, "\"EPSG:6933\"");
        let back: Crs = serde_json::from_str("null").unwrap();
        assert_eq!(back, Crs::Unknown);
    }
}
