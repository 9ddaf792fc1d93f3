//! Coordinate Reference System handling

mod transform;

pub use transform::{Projection, Transformer};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known (primary)
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// NAD83 geographic CRS (EPSG:4269)
    pub fn nad83() -> Self {
        Self::from_epsg(4269)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// True when coordinates are angular (longitude/latitude in degrees).
    ///
    /// Buffer distances are in CRS units, so geographic layers must be
    /// projected before buffering.
    pub fn is_geographic(&self) -> bool {
        matches!(
            self.epsg.map(Projection::from_epsg),
            Some(Ok(Projection::Geographic))
        )
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Textual comparison is the best we can do without a WKT parser
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }

    /// OGC URN form used by the legacy GeoJSON `crs` member
    pub fn urn(&self) -> Option<String> {
        self.epsg
            .map(|code| format!("urn:ogc:def:crs:EPSG::{}", code))
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Accepts `EPSG:26913`, `epsg:26913`, `26913`, OGC URNs with or
    /// without a version (`urn:ogc:def:crs:EPSG::26913`,
    /// `urn:ogc:def:crs:EPSG:6.3:26913`), OGC http URIs, `OGC:CRS84`, PROJ strings
    /// (`+proj=...`) and raw WKT.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::UnsupportedCrs("empty CRS string".into()));
        }

        let upper = s.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Self::wgs84());
        }

        // URNs may carry a version between authority and code: EPSG:6.3:26913
        let code = if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:") {
            rest.rsplit(':').next().unwrap_or(rest)
        } else if let Some(rest) = upper.strip_prefix("HTTP://WWW.OPENGIS.NET/DEF/CRS/EPSG/") {
            rest.rsplit('/').next().unwrap_or(rest)
        } else {
            upper.strip_prefix("EPSG:").unwrap_or(&upper)
        };
        if let Ok(code) = code.parse::<u32>() {
            return Ok(Self::from_epsg(code));
        }

        if s.starts_with('+') {
            return Ok(Self::from_proj(s));
        }
        if s.contains('[') {
            return Ok(Self::from_wkt(s));
        }

        Err(Error::UnsupportedCrs(s.to_string()))
    }
}

impl TryFrom<String> for CRS {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CRS> for String {
    fn from(crs: CRS) -> Self {
        match (&crs.wkt, &crs.proj) {
            (Some(wkt), _) if crs.epsg.is_none() => wkt.clone(),
            (_, Some(proj)) if crs.epsg.is_none() => proj.clone(),
            _ => crs.identifier(),
        }
    }
}
