use crate::model::TrafficError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uom::si::f64::Length;

pub const DEFAULT_MATCHING_RADIUS_METERS: f64 = 200.0;

/// defines the inputs and behaviors of a traffic matching run
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct TrafficMatchingConfiguration {
    /// link geometries and directionality
    #[serde(alias = "streets")]
    pub streets_file: Option<String>,
    /// speed values per pattern, 15 minute buckets
    #[serde(alias = "pattern_15min")]
    pub patterns_file: Option<String>,
    /// pattern id per link, travel direction and weekday
    #[serde(alias = "ref_pattern")]
    pub ref_pattern_file: Option<String>,
    /// search radius in meters around each traffic link
    #[serde(alias = "radius")]
    matching_radius: Option<f64>,
    /// write GeoJSON diagnostics of the matched geometries
    #[serde(default)]
    pub output_log: bool,
    /// discard a traffic storage left in the output directory by a previous run
    #[serde(default)]
    pub overwrite: bool,
}

impl TrafficMatchingConfiguration {
    pub fn new(streets_file: &str, patterns_file: &str, ref_pattern_file: &str) -> Self {
        TrafficMatchingConfiguration {
            streets_file: Some(String::from(streets_file)),
            patterns_file: Some(String::from(patterns_file)),
            ref_pattern_file: Some(String::from(ref_pattern_file)),
            matching_radius: None,
            output_log: false,
            overwrite: false,
        }
    }

    pub fn streets_file(&self) -> Result<&Path, TrafficError> {
        required(&self.streets_file, "streets_file")
    }

    pub fn patterns_file(&self) -> Result<&Path, TrafficError> {
        required(&self.patterns_file, "patterns_file")
    }

    pub fn ref_pattern_file(&self) -> Result<&Path, TrafficError> {
        required(&self.ref_pattern_file, "ref_pattern_file")
    }

    pub fn get_matching_radius(&self) -> Length {
        let meters = self
            .matching_radius
            .unwrap_or(DEFAULT_MATCHING_RADIUS_METERS);
        Length::new::<uom::si::length::meter>(meters)
    }

    /// confirms all required files are named and the radius is usable.
    pub fn validate(&self) -> Result<(), TrafficError> {
        self.streets_file()?;
        self.patterns_file()?;
        self.ref_pattern_file()?;
        match self.matching_radius {
            Some(r) if !r.is_finite() || r <= 0.0 => Err(TrafficError::ConfigurationError(
                format!("matching_radius must be a positive number of meters, found {r}"),
            )),
            _ => Ok(()),
        }
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a Path, TrafficError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(Path::new(v)),
        _ => {
            log::error!("missing traffic matching configuration parameter '{key}'");
            Err(TrafficError::MissingParameter(String::from(key)))
        }
    }
}

impl TryFrom<&String> for TrafficMatchingConfiguration {
    type Error = TrafficError;

    fn try_from(f: &String) -> Result<Self, Self::Error> {
        let conf: TrafficMatchingConfiguration = if f.ends_with(".toml") {
            let s = std::fs::read_to_string(f).map_err(|e| {
                TrafficError::ConfigurationError(format!("failure reading {f}: {e}"))
            })?;
            toml::from_str(&s).map_err(|e| {
                TrafficError::ConfigurationError(format!("failure decoding {f}: {e}"))
            })?
        } else if f.ends_with(".json") {
            let s = std::fs::read_to_string(f).map_err(|e| {
                TrafficError::ConfigurationError(format!("failure reading {f}: {e}"))
            })?;
            serde_json::from_str(&s).map_err(|e| {
                TrafficError::ConfigurationError(format!("failure decoding {f}: {e}"))
            })?
        } else {
            return Err(TrafficError::ConfigurationError(format!(
                "unsupported file type: {f}"
            )));
        };
        conf.validate()?;
        Ok(conf)
    }
}
