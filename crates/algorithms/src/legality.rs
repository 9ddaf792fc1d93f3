//! Legality tagging
//!
//! Every layer that feeds the legality map carries the same four columns:
//!
//! | column         | content                                   |
//! |----------------|-------------------------------------------|
//! | `legality`     | `illegal`, `maybe legal` or `legal`       |
//! | `reasoning`    | why the area has that status              |
//! | `land_owner`   | owning jurisdiction, e.g. `USFS`, `BLM`   |
//! | `last_updated` | `YYYY-MM-DD`, UTC                         |

use chrono::{NaiveDate, Utc};
use legalmap_core::vector::{AttributeValue, FeatureCollection};
use legalmap_core::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Columns kept by [`tag_legality`]
pub const LEGALITY_COLUMNS: [&str; 4] = ["legality", "reasoning", "land_owner", "last_updated"];

/// Date format of the `last_updated` column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Legal status of an area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Legality {
    Illegal,
    MaybeLegal,
    Legal,
}

impl Legality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Legality::Illegal => "illegal",
            Legality::MaybeLegal => "maybe legal",
            Legality::Legal => "legal",
        }
    }
}

impl fmt::Display for Legality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Legality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "illegal" => Ok(Legality::Illegal),
            "maybe legal" | "maybe" => Ok(Legality::MaybeLegal),
            "legal" => Ok(Legality::Legal),
            _ => Err(Error::InvalidParameter {
                name: "legality",
                value: s.to_string(),
                reason: "expected illegal, maybe legal or legal".into(),
            }),
        }
    }
}

/// Values written by [`tag_legality`]
#[derive(Debug, Clone, PartialEq)]
pub struct LegalityTag {
    pub legality: Legality,
    pub reasoning: String,
    pub land_owner: String,
    /// Defaults to today's UTC date
    pub last_updated: Option<NaiveDate>,
}

impl LegalityTag {
    pub fn new(legality: Legality, reasoning: impl Into<String>, land_owner: impl Into<String>) -> Self {
        Self {
            legality,
            reasoning: reasoning.into(),
            land_owner: land_owner.into(),
            last_updated: None,
        }
    }

    pub fn updated_on(mut self, date: NaiveDate) -> Self {
        self.last_updated = Some(date);
        self
    }
}

/// Tag a copy of `fc` with the legality columns.
///
/// Every other attribute is dropped so the result matches the legality
/// schema exactly. Geometry and the CRS tag are kept.
pub fn tag_legality(fc: &FeatureCollection, tag: &LegalityTag) -> FeatureCollection {
    let date = tag
        .last_updated
        .unwrap_or_else(|| Utc::now().date_naive())
        .format(DATE_FORMAT)
        .to_string();
    debug!(
        "Tagging {} features as {} ({})",
        fc.len(),
        tag.legality,
        tag.land_owner
    );

    let mut tagged = fc.clone();
    for feature in tagged.iter_mut() {
        feature.properties.clear();
        feature.set_property("legality", tag.legality.as_str());
        feature.set_property("reasoning", tag.reasoning.as_str());
        feature.set_property("land_owner", tag.land_owner.as_str());
        feature.set_property("last_updated", AttributeValue::String(date.clone()));
    }
    tagged
}

/// Concatenate tagged layers into one.
///
/// The first layer's CRS tags the result; every layer must share it.
pub fn merge_legality_layers(layers: Vec<FeatureCollection>) -> Result<FeatureCollection> {
    let mut layers = layers.into_iter();
    let mut merged = layers
        .next()
        .ok_or_else(|| Error::EmptyInput("no layers provided to merge".into()))?;

    for layer in layers {
        let same = match (&merged.crs, &layer.crs) {
            (Some(a), Some(b)) => a.is_equivalent(b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            let id = |c: &Option<legalmap_core::CRS>| {
                c.as_ref().map(|c| c.identifier()).unwrap_or_else(|| "none".into())
            };
            return Err(Error::CrsMismatch(id(&merged.crs), id(&layer.crs)));
        }
        merged.features.extend(layer);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{point, Geometry};
    use legalmap_core::vector::Feature;
    use legalmap_core::CRS;

    fn buffered_roads() -> FeatureCollection {
        let mut fc = FeatureCollection::with_crs(CRS::from_epsg(26913));
        fc.push(
            Feature::new(Geometry::Point(point!(x: 1.0, y: 1.0)))
                .with_property("ROUTE", "FS 110")
                .with_property("SEASONAL", "yes"),
        );
        fc.push(Feature::new(Geometry::Point(point!(x: 2.0, y: 2.0))).with_property("ROUTE", "FS 112"));
        fc
    }

    #[test]
    fn test_parse_legality() {
        assert_eq!("illegal".parse::<Legality>().unwrap(), Legality::Illegal);
        assert_eq!("Maybe Legal".parse::<Legality>().unwrap(), Legality::MaybeLegal);
        assert_eq!("maybe_legal".parse::<Legality>().unwrap(), Legality::MaybeLegal);
        assert_eq!("legal".parse::<Legality>().unwrap(), Legality::Legal);
        assert!("forbidden".parse::<Legality>().is_err());
        assert_eq!(Legality::MaybeLegal.to_string(), "maybe legal");
    }

    #[test]
    fn test_tag_filters_to_schema() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let tag = LegalityTag::new(Legality::Illegal, "Within 300 ft of a road", "USFS").updated_on(date);

        let source = buffered_roads();
        let tagged = tag_legality(&source, &tag);

        assert_eq!(tagged.columns(), {
            let mut cols: Vec<String> = LEGALITY_COLUMNS.iter().map(|c| c.to_string()).collect();
            cols.sort();
            cols
        });
        let f = &tagged.features[0];
        assert_eq!(f.get_property("legality").unwrap().as_str(), Some("illegal"));
        assert_eq!(f.get_property("land_owner").unwrap().as_str(), Some("USFS"));
        assert_eq!(f.get_property("last_updated").unwrap().as_str(), Some("2025-06-01"));
        assert!(f.get_property("ROUTE").is_none());
        assert_eq!(tagged.crs, source.crs);
        // the input is untouched
        assert!(source.features[0].get_property("ROUTE").is_some());
    }

    #[test]
    fn test_tag_defaults_to_today() {
        let tag = LegalityTag::new(Legality::Legal, "Open BLM land", "BLM");
        let tagged = tag_legality(&buffered_roads(), &tag);
        let value = tagged.features[0].get_property("last_updated").unwrap().to_string();
        assert!(NaiveDate::parse_from_str(&value, DATE_FORMAT).is_ok());
    }

    #[test]
    fn test_merge_concatenates() {
        let tag = LegalityTag::new(Legality::Illegal, "road", "USFS");
        let a = tag_legality(&buffered_roads(), &tag);
        let b = tag_legality(&buffered_roads(), &tag);
        let merged = merge_legality_layers(vec![a, b]).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.crs, Some(CRS::from_epsg(26913)));
    }

    #[test]
    fn test_merge_empty_fails() {
        assert!(matches!(
            merge_legality_layers(vec![]),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_merge_crs_mismatch() {
        let mut other = buffered_roads();
        other.crs = Some(CRS::wgs84());
        assert!(matches!(
            merge_legality_layers(vec![buffered_roads(), other]),
            Err(Error::CrsMismatch(_, _))
        ));
    }
}
