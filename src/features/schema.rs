//! Feature schema descriptor
//!
//! The schema is the frozen contract between the artifact producer and this
//! service: the exact ordered set of numeric columns a model was trained on.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ServingError, ServingResult};

/// Version tag of the built-in schema.
pub const LOAD_SHORTFALL_V1: &str = "load-shortfall/v1";

/// How a feature reaches its numeric form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Plain numeric measurement
    Continuous,
    /// Integer code, possibly string-encoded in the payload (e.g. `level_7`)
    Code,
    /// Derived from the record timestamp
    Calendar,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureField {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureField {
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered, versioned list of named features.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSchema {
    pub version: String,
    pub fields: Vec<FeatureField>,
}

static BUILTIN: Lazy<FeatureSchema> = Lazy::new(|| {
    use FeatureKind::*;

    let fields = [
        ("Madrid_wind_speed", Continuous),
        ("Valencia_wind_deg", Code),
        ("Bilbao_rain_1h", Continuous),
        ("Valencia_wind_speed", Continuous),
        ("Seville_humidity", Continuous),
        ("Madrid_humidity", Continuous),
        ("Bilbao_clouds_all", Continuous),
        ("Bilbao_wind_speed", Continuous),
        ("Seville_clouds_all", Continuous),
        ("Bilbao_wind_deg", Continuous),
        ("Barcelona_wind_speed", Continuous),
        ("Barcelona_wind_deg", Continuous),
        ("Madrid_clouds_all", Continuous),
        ("Seville_wind_speed", Continuous),
        ("Barcelona_rain_1h", Continuous),
        ("Seville_pressure", Code),
        ("Seville_rain_1h", Continuous),
        ("Bilbao_snow_3h", Continuous),
        ("Barcelona_pressure", Continuous),
        ("Seville_rain_3h", Continuous),
        ("Madrid_rain_1h", Continuous),
        ("Barcelona_rain_3h", Continuous),
        ("Valencia_snow_3h", Continuous),
        ("Madrid_weather_id", Continuous),
        ("Barcelona_weather_id", Continuous),
        ("Bilbao_pressure", Continuous),
        ("Seville_weather_id", Continuous),
        ("Valencia_pressure", Continuous),
        ("Seville_temp_max", Continuous),
        ("Bilbao_weather_id", Continuous),
        ("Valencia_humidity", Continuous),
        ("Year", Calendar),
        ("Month_of_year", Calendar),
        ("Day_of_month", Calendar),
        ("Day_of_week", Calendar),
        ("Hour_of_day", Calendar),
    ];

    FeatureSchema {
        version: LOAD_SHORTFALL_V1.to_string(),
        fields: fields
            .iter()
            .map(|(name, kind)| FeatureField::new(*name, *kind))
            .collect(),
    }
});

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated field names.
    pub fn new(version: impl Into<String>, fields: Vec<FeatureField>) -> ServingResult<Self> {
        let schema = Self {
            version: version.into(),
            fields,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// The 36-column schema the load shortfall models are trained on.
    pub fn builtin() -> &'static FeatureSchema {
        &BUILTIN
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Fields of the given kind, in schema order
    pub fn fields_of_kind(&self, kind: FeatureKind) -> impl Iterator<Item = &FeatureField> + '_ {
        self.fields.iter().filter(move |f| f.kind == kind)
    }

    /// Check structural soundness of a schema read from an artifact.
    pub fn validate(&self) -> ServingResult<()> {
        if self.version.trim().is_empty() {
            return Err(ServingError::corrupt("feature schema has no version"));
        }
        if self.fields.is_empty() {
            return Err(ServingError::corrupt("feature schema has no fields"));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ServingError::corrupt("feature schema has an unnamed field"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ServingError::corrupt(format!(
                    "feature schema lists `{}` more than once",
                    field.name
                )));
            }
        }
        Ok(())
    }
}
