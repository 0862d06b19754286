//! The `City` domain record and the ASCII-folding used to key comparisons on it.

use crate::error::{GeodashError, Result};
use serde::{Deserialize, Serialize};

/// An immutable city record. Created once by the corpus loader; never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Stable 32-bit primary key.
    pub id: u32,
    /// Original Unicode name, as supplied by the corpus.
    pub name: String,
    /// Lowercase, diacritic-stripped ASCII fold of `name`. Always non-empty.
    pub ascii_name: String,
    /// Display country name.
    pub country: String,
    /// ISO-3166-1 alpha-2 code, uppercase. Required.
    pub country_code: String,
    /// Display state/province/region name, if any.
    pub state: Option<String>,
    /// State/province code, if any.
    pub state_code: Option<String>,
    /// Latitude in degrees, within [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, within [-180, 180].
    pub lng: f64,
    pub population: Option<i64>,
    pub timezone: Option<String>,
    /// External identifier from the upstream gazetteer, when known.
    pub geonames_id: Option<i64>,
}

impl City {
    /// Validates the invariants of §3: `country_code` length 2, `lat`/`lng` in range,
    /// `ascii_name` non-empty. Does not mutate `self`; callers that need a derived
    /// `ascii_name` should call [`ascii_fold`] before constructing the record.
    pub fn validate(&self) -> Result<()> {
        if self.country_code.len() != 2 {
            return Err(GeodashError::InvalidParameter(format!(
                "country_code must be 2 characters, got {:?}",
                self.country_code
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeodashError::InvalidParameter(format!(
                "lat out of range: {}",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(GeodashError::InvalidParameter(format!(
                "lng out of range: {}",
                self.lng
            )));
        }
        if self.ascii_name.is_empty() {
            return Err(GeodashError::InvalidParameter(
                "ascii_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lowercases and diacritic-strips `s` to the nearest ASCII letters, yielding a comparison key
/// stable across locales (GLOSSARY: "ASCII fold").
pub fn ascii_fold(s: &str) -> String {
    deunicode::deunicode(s).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_city() -> City {
        City {
            id: 1,
            name: "San Francisco".to_string(),
            ascii_name: "san francisco".to_string(),
            country: "United States".to_string(),
            country_code: "US".to_string(),
            state: Some("California".to_string()),
            state_code: Some("CA".to_string()),
            lat: 37.7749,
            lng: -122.4194,
            population: Some(873_965),
            timezone: Some("America/Los_Angeles".to_string()),
            geonames_id: Some(5_391_959),
        }
    }

    #[test]
    fn validates_well_formed_city() {
        assert!(sample_city().validate().is_ok());
    }

    #[test]
    fn rejects_bad_country_code_length() {
        let mut city = sample_city();
        city.country_code = "USA".to_string();
        assert!(matches!(
            city.validate(),
            Err(GeodashError::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let mut city = sample_city();
        city.lat = 120.0;
        assert!(city.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        let mut city = sample_city();
        city.lng = -200.0;
        assert!(city.validate().is_err());
    }

    #[test]
    fn rejects_empty_ascii_name() {
        let mut city = sample_city();
        city.ascii_name = String::new();
        assert!(city.validate().is_err());
    }

    #[test]
    fn ascii_fold_strips_diacritics_and_lowercases() {
        assert_eq!(ascii_fold("Sancti Spíritus"), "sancti spiritus");
        assert_eq!(ascii_fold("MÜNCHEN"), "munchen");
        assert_eq!(ascii_fold("São Paulo"), "sao paulo");
    }

    #[test]
    fn ascii_fold_is_idempotent_on_plain_ascii() {
        assert_eq!(ascii_fold("Newark"), "newark");
    }
}
