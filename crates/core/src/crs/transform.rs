//! Pure-Rust coordinate transforms (Snyder 1987, USGS formulas).
//!
//! Covers the projections the layer pipeline works in: geographic
//! WGS84/NAD83, Web Mercator, WGS84 UTM (EPSG 326xx / 327xx) and NAD83
//! UTM north (EPSG 269xx). NAD83 and WGS84 are treated as the same datum;
//! the shift between them is below two metres in the conterminous US.

use super::CRS;
use crate::error::{Error, Result};
use geo::MapCoords;
use geo_types::{Coord, Geometry};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

// ── Ellipsoid constants (WGS84; GRS80 differs by < 1e-9 in flattening) ──

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Latitude limit of the Web Mercator square
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// A projection this module knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Longitude/latitude in degrees (EPSG 4326, 4269)
    Geographic,
    /// Spherical Web Mercator (EPSG 3857)
    WebMercator,
    /// Transverse Mercator, 6° zones
    Utm { zone: u32, north: bool },
}

impl Projection {
    /// Resolve an EPSG code to a supported projection.
    pub fn from_epsg(epsg: u32) -> Result<Self> {
        match epsg {
            4326 | 4269 => Ok(Projection::Geographic),
            3857 | 900913 => Ok(Projection::WebMercator),
            32601..=32660 => Ok(Projection::Utm { zone: epsg - 32600, north: true }),
            32701..=32760 => Ok(Projection::Utm { zone: epsg - 32700, north: false }),
            26901..=26923 => Ok(Projection::Utm { zone: epsg - 26900, north: true }),
            _ => Err(Error::UnsupportedCrs(format!("EPSG:{}", epsg))),
        }
    }

    /// Resolve a CRS value; only EPSG-tagged systems are supported.
    pub fn from_crs(crs: &CRS) -> Result<Self> {
        match crs.epsg() {
            Some(code) => Self::from_epsg(code),
            None => Err(Error::UnsupportedCrs(crs.identifier())),
        }
    }

    /// Project (lon, lat) degrees into this system.
    fn forward(&self, lon: f64, lat: f64) -> Coord<f64> {
        match *self {
            Projection::Geographic => Coord { x: lon, y: lat },
            Projection::WebMercator => {
                let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
                Coord {
                    x: A * lon.to_radians(),
                    y: A * (FRAC_PI_4 + lat / 2.0).tan().ln(),
                }
            }
            Projection::Utm { zone, north } => {
                let (x, y) = geographic_to_utm(lon, lat, zone, north);
                Coord { x, y }
            }
        }
    }

    /// Unproject a coordinate of this system into (lon, lat) degrees.
    fn inverse(&self, c: Coord<f64>) -> (f64, f64) {
        match *self {
            Projection::Geographic => (c.x, c.y),
            Projection::WebMercator => {
                let lon = (c.x / A).to_degrees();
                let lat = (2.0 * (c.y / A).exp().atan() - FRAC_PI_2).to_degrees();
                (lon, lat)
            }
            Projection::Utm { zone, north } => utm_to_geographic(c.x, c.y, zone, north),
        }
    }
}

/// Transforms coordinates between two supported CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformer {
    from: Projection,
    to: Projection,
}

impl Transformer {
    /// Build a transformer; fails if either side is unsupported.
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        Ok(Self {
            from: Projection::from_crs(from)?,
            to: Projection::from_crs(to)?,
        })
    }

    /// True when source and target evaluate identically.
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Transform a single coordinate.
    pub fn transform_coord(&self, c: Coord<f64>) -> Coord<f64> {
        if self.is_identity() {
            return c;
        }
        let (lon, lat) = self.from.inverse(c);
        self.to.forward(lon, lat)
    }

    /// Transform every coordinate of a geometry.
    pub fn transform_geometry(&self, geom: &Geometry<f64>) -> Geometry<f64> {
        if self.is_identity() {
            return geom.clone();
        }
        geom.map_coords(|c| self.transform_coord(c))
    }
}

// ── Transverse Mercator (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// WGS84 (longitude, latitude) in degrees to UTM (easting, northing) in metres.
fn geographic_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0
        * (m
            + n * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

/// UTM (easting, northing) in metres to (longitude, latitude) in degrees.
fn utm_to_geographic(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north { northing } else { northing - FALSE_NORTHING_SOUTH };

    let e4 = E2 * E2;
    let e6 = e4 * E2;

    // Footpoint latitude (Snyder eq. 7-19, 3-24, 3-26)
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - E2).sqrt()) / (1.0 + (1.0 - E2).sqrt());
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    // Snyder eq. 8-17, 8-18
    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos_phi1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}
