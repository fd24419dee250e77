//! Validated parameter values shared by the protocol query builders.
//!
//! Every constraint here fails at set time, before any request is issued.

use lazy_static::lazy_static;
use regex::Regex;
use strum::{Display, EnumString};

use vo_core::errors::ParamError;

lazy_static! {
    static ref RANGE_NUMBER: Regex =
        Regex::new(r"^(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("invalid range-number regex");
    static ref MIME_TYPE: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+-]*/[A-Za-z0-9][A-Za-z0-9.+-]*$")
            .expect("invalid mime regex");
}

/// A validated equatorial position.
///
/// Declination outside `[-90, 90]` is rejected; right ascension is
/// normalized into `[0, 360)` by repeated ±360 adjustment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pos {
    ra: f64,
    dec: f64,
}

impl Pos {
    /// Validates and normalizes a `(ra, dec)` pair in degrees.
    pub fn new(ra: f64, dec: f64) -> Result<Self, ParamError> {
        if !dec.is_finite() || !(-90.0..=90.0).contains(&dec) {
            return Err(ParamError::OutOfRange {
                name: "DEC",
                value: dec.to_string(),
                expected: "[-90, 90]",
            });
        }
        if !ra.is_finite() {
            return Err(ParamError::OutOfRange {
                name: "RA",
                value: ra.to_string(),
                expected: "a finite angle",
            });
        }
        let mut ra = ra;
        while ra < 0.0 {
            ra += 360.0;
        }
        while ra >= 360.0 {
            ra -= 360.0;
        }
        Ok(Self { ra, dec })
    }

    /// Right ascension in degrees, normalized into `[0, 360)`.
    pub fn ra(&self) -> f64 {
        self.ra
    }

    /// Declination in degrees.
    pub fn dec(&self) -> f64 {
        self.dec
    }

    /// Renders the position as the comma-joined wire value.
    pub fn to_wire(&self) -> String {
        format!("{},{}", self.ra, self.dec)
    }
}

/// A validated angular search size of one or two components.
///
/// A single component bounds both axes, so it must fit the declination
/// constraint `(0, 180]`; with two components the first (RA axis) may reach
/// `(0, 360]` while the second stays within `(0, 180]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Size {
    components: Vec<f64>,
}

impl Size {
    /// Validates a one- or two-component size in degrees.
    pub fn new(components: &[f64]) -> Result<Self, ParamError> {
        if components.is_empty() || components.len() > 2 {
            return Err(ParamError::UnknownValue {
                name: "SIZE",
                value: format!("{} components", components.len()),
            });
        }
        let bounds: &[(f64, &'static str)] = if components.len() == 1 {
            &[(180.0, "(0, 180]")]
        } else {
            &[(360.0, "(0, 360]"), (180.0, "(0, 180]")]
        };
        for (component, &(max, expected)) in components.iter().zip(bounds) {
            if !component.is_finite() || *component <= 0.0 || *component > max {
                return Err(ParamError::OutOfRange {
                    name: "SIZE",
                    value: component.to_string(),
                    expected,
                });
            }
        }
        Ok(Self {
            components: components.to_vec(),
        })
    }

    /// The size components in degrees.
    pub fn components(&self) -> &[f64] {
        &self.components
    }

    /// Renders the size as the comma-joined wire value.
    pub fn to_wire(&self) -> String {
        self.components
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Validates a search radius in degrees, `(0, 180]`.
pub fn validate_radius(name: &'static str, radius: f64) -> Result<f64, ParamError> {
    if !radius.is_finite() || radius <= 0.0 || radius > 180.0 {
        return Err(ParamError::OutOfRange {
            name,
            value: radius.to_string(),
            expected: "(0, 180]",
        });
    }
    Ok(radius)
}

/// Spatial-region intersection modes accepted by image search.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Intersect {
    /// The candidate region fully covers the search region.
    Covers,
    /// The candidate region lies fully inside the search region.
    Enclosed,
    /// The candidate region contains the search center.
    Center,
    /// The regions overlap at all.
    Overlaps,
}

impl Intersect {
    /// Parses the wire value, case-insensitively.
    pub fn from_wire(value: &str) -> Result<Self, ParamError> {
        value.parse().map_err(|_| ParamError::UnknownValue {
            name: "INTERSECT",
            value: value.to_string(),
        })
    }
}

/// Validates an image-search FORMAT value.
///
/// Accepts the special values `ALL`, `GRAPHIC`, `GRAPHIC-ALL`, `METADATA`,
/// a `GRAPHIC-<fmt,...>` preference list, or one or more MIME types. Special
/// values are canonicalized to upper case; MIME types pass through as given.
pub fn validate_image_format(value: &str) -> Result<String, ParamError> {
    let upper = value.to_uppercase();
    match upper.as_str() {
        "ALL" | "GRAPHIC" | "GRAPHIC-ALL" | "METADATA" => return Ok(upper),
        _ => {}
    }
    if let Some(preferences) = upper.strip_prefix("GRAPHIC-") {
        if !preferences.is_empty()
            && preferences
                .split(',')
                .all(|fmt| !fmt.is_empty() && fmt.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Ok(upper);
        }
        return Err(ParamError::UnknownValue {
            name: "FORMAT",
            value: value.to_string(),
        });
    }
    if value.split(',').all(|mime| MIME_TYPE.is_match(mime.trim())) {
        return Ok(value.to_string());
    }
    Err(ParamError::UnknownValue {
        name: "FORMAT",
        value: value.to_string(),
    })
}

/// Validates a spectral FORMAT value (SSA conventions).
pub fn validate_spectrum_format(value: &str) -> Result<String, ParamError> {
    const SPECIAL: &[&str] = &[
        "all", "compliant", "native", "graphic", "votable", "fits", "xml", "metadata",
    ];
    let lower = value.to_lowercase();
    if SPECIAL.contains(&lower.as_str()) {
        return Ok(lower);
    }
    if value.split(',').all(|mime| MIME_TYPE.is_match(mime.trim())) {
        return Ok(value.to_string());
    }
    Err(ParamError::UnknownValue {
        name: "FORMAT",
        value: value.to_string(),
    })
}

/// Validates a numeric range list such as `1e-7/2e-6,2.1e-6`.
///
/// Each comma-separated segment is either a bare number or a `lo/hi` range
/// where either bound may be left open, but not both.
pub fn validate_range_list(name: &'static str, value: &str) -> Result<(), ParamError> {
    let bad = || ParamError::BadRangeList {
        name,
        value: value.to_string(),
    };
    if value.is_empty() {
        return Err(bad());
    }
    for segment in value.split(',') {
        match segment.split_once('/') {
            Some(("", "")) => return Err(bad()),
            Some((lo, hi)) => {
                for bound in [lo, hi] {
                    if !bound.is_empty() && !RANGE_NUMBER.is_match(bound) {
                        return Err(bad());
                    }
                }
            }
            None => {
                if !RANGE_NUMBER.is_match(segment) {
                    return Err(bad());
                }
            }
        }
    }
    Ok(())
}

fn parse_instant(raw: &str) -> bool {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").is_ok()
        || chrono::DateTime::parse_from_rfc3339(raw).is_ok()
}

/// Validates an epoch range list of ISO-8601 instants, such as
/// `2010-01-01/2010-06-30,2011-03-01`.
pub fn validate_time_list(name: &'static str, value: &str) -> Result<(), ParamError> {
    let bad = || ParamError::BadRangeList {
        name,
        value: value.to_string(),
    };
    if value.is_empty() {
        return Err(bad());
    }
    for segment in value.split(',') {
        match segment.split_once('/') {
            Some(("", "")) => return Err(bad()),
            Some((lo, hi)) => {
                for bound in [lo, hi] {
                    if !bound.is_empty() && !parse_instant(bound) {
                        return Err(bad());
                    }
                }
            }
            None => {
                if !parse_instant(segment) {
                    return Err(bad());
                }
            }
        }
    }
    Ok(())
}

/// Validates a verbosity level against the protocol's maximum.
pub fn validate_verbosity(level: u8, max: u8) -> Result<u8, ParamError> {
    if level > max {
        return Err(ParamError::OutOfRange {
            name: "VERB",
            value: level.to_string(),
            expected: "a small verbosity level",
        });
    }
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_roundtrips_valid_coordinates() {
        let pos = Pos::new(202.48, 47.23).unwrap();
        assert_eq!(pos.ra(), 202.48);
        assert_eq!(pos.dec(), 47.23);
        assert_eq!(pos.to_wire(), "202.48,47.23");
    }

    #[test]
    fn pos_normalizes_ra_into_range() {
        assert_eq!(Pos::new(-30.0, 0.0).unwrap().ra(), 330.0);
        assert_eq!(Pos::new(480.0, 0.0).unwrap().ra(), 120.0);
        assert_eq!(Pos::new(720.0, 0.0).unwrap().ra(), 0.0);
    }

    #[test]
    fn pos_rejects_out_of_range_declination() {
        assert!(Pos::new(0.0, 90.5).is_err());
        assert!(Pos::new(0.0, -91.0).is_err());
        assert!(Pos::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn size_bounds_depend_on_axis() {
        assert!(Size::new(&[0.25]).is_ok());
        assert!(Size::new(&[200.0]).is_err());
        assert!(Size::new(&[200.0, 90.0]).is_ok());
        assert!(Size::new(&[200.0, 181.0]).is_err());
        assert!(Size::new(&[]).is_err());
        assert!(Size::new(&[1.0, 1.0, 1.0]).is_err());
        assert_eq!(Size::new(&[1.0, 0.5]).unwrap().to_wire(), "1,0.5");
    }

    #[test]
    fn radius_must_be_positive_and_bounded() {
        assert_eq!(validate_radius("SR", 0.5).unwrap(), 0.5);
        assert!(validate_radius("SR", 0.0).is_err());
        assert!(validate_radius("SR", -1.0).is_err());
        assert!(validate_radius("SR", 180.5).is_err());
    }

    #[test]
    fn intersect_is_case_insensitive_and_canonical() {
        assert_eq!(Intersect::from_wire("covers").unwrap(), Intersect::Covers);
        assert_eq!(Intersect::from_wire("OVERLAPS").unwrap().to_string(), "OVERLAPS");
        assert!(Intersect::from_wire("touches").is_err());
    }

    #[test]
    fn image_format_accepts_special_values_and_mime_types() {
        assert_eq!(validate_image_format("all").unwrap(), "ALL");
        assert_eq!(validate_image_format("metadata").unwrap(), "METADATA");
        assert_eq!(validate_image_format("graphic-png,jpeg").unwrap(), "GRAPHIC-PNG,JPEG");
        assert_eq!(validate_image_format("image/fits").unwrap(), "image/fits");
        assert!(validate_image_format("image/fits,image/jpeg").is_ok());
        assert!(validate_image_format("fits").is_err());
        assert!(validate_image_format("graphic-").is_err());
    }

    #[test]
    fn range_lists_validate_per_segment() {
        assert!(validate_range_list("BAND", "1e-7/2e-6").is_ok());
        assert!(validate_range_list("BAND", "0.5/0.9,1.2").is_ok());
        assert!(validate_range_list("BAND", "/2e-6").is_ok());
        assert!(validate_range_list("BAND", "1e-7/").is_ok());
        assert!(validate_range_list("BAND", "/").is_err());
        assert!(validate_range_list("BAND", "").is_err());
        assert!(validate_range_list("BAND", "1e-7/2e-6,abc").is_err());
        assert!(validate_range_list("BAND", "1..2").is_err());
    }

    #[test]
    fn time_lists_accept_iso_instants() {
        assert!(validate_time_list("TIME", "2010-01-01/2010-06-30").is_ok());
        assert!(validate_time_list("TIME", "2010-01-01T12:00:00/").is_ok());
        assert!(validate_time_list("TIME", "2010-13-40").is_err());
        assert!(validate_time_list("TIME", "noon").is_err());
    }
}
