//! Payload preprocessing
//!
//! Turns raw request payloads into schema-conformant feature vectors, using
//! only constants frozen at training time and shipped inside the artifact.
//! Transformations run in a fixed order: calendar derivation from the
//! timestamp, code extraction, numeric coercion and null filling, schema
//! selection, then optional standardization.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::record::{json_type_name, Record, RecordBatch};
use super::schema::{FeatureKind, FeatureSchema};
use crate::error::{ServingError, ServingResult};
use crate::ml::FeatureVector;

/// Default name of the timestamp column in request payloads.
pub const DEFAULT_TIMESTAMP_FIELD: &str = "time";

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Per-feature z-score parameters fitted on the training set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

/// Preprocessing constants frozen at training time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreprocessingSpec {
    /// Payload field calendar features are derived from
    pub timestamp_field: Option<String>,
    /// Features that may arrive string-encoded (e.g. `"level_7"`)
    pub code_fields: Vec<String>,
    /// Substitutes for absent or null values, keyed by feature name
    pub fill_constants: BTreeMap<String, f64>,
    pub scaler: Option<Standardizer>,
}

impl PreprocessingSpec {
    /// Constants deriving code fields and calendar handling from the schema's
    /// field kinds, with no fill constants and no scaler.
    pub fn for_schema(schema: &FeatureSchema) -> Self {
        let has_calendar = schema.fields_of_kind(FeatureKind::Calendar).next().is_some();
        Self {
            timestamp_field: has_calendar.then(|| DEFAULT_TIMESTAMP_FIELD.to_string()),
            code_fields: schema
                .fields_of_kind(FeatureKind::Code)
                .map(|f| f.name.clone())
                .collect(),
            fill_constants: BTreeMap::new(),
            scaler: None,
        }
    }

    pub fn with_fill_constant(mut self, feature: impl Into<String>, value: f64) -> Self {
        self.fill_constants.insert(feature.into(), value);
        self
    }

    pub fn with_scaler(mut self, scaler: Standardizer) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// Check the constants agree with the schema they will be applied to.
    pub fn validate(&self, schema: &FeatureSchema) -> ServingResult<()> {
        if let Some(field) = &self.timestamp_field {
            if field.trim().is_empty() {
                return Err(ServingError::corrupt("timestamp field name is empty"));
            }
        }

        for name in &self.code_fields {
            if !schema.contains(name) {
                return Err(ServingError::corrupt(format!(
                    "code field `{}` is not part of the feature schema",
                    name
                )));
            }
        }

        for (name, value) in &self.fill_constants {
            if !schema.contains(name) {
                return Err(ServingError::corrupt(format!(
                    "fill constant for unknown feature `{}`",
                    name
                )));
            }
            if !value.is_finite() {
                return Err(ServingError::corrupt(format!(
                    "fill constant for `{}` is not finite",
                    name
                )));
            }
        }

        if let Some(scaler) = &self.scaler {
            if scaler.means.len() != schema.len() || scaler.stds.len() != schema.len() {
                return Err(ServingError::corrupt(format!(
                    "scaler has {} means and {} stds for {} features",
                    scaler.means.len(),
                    scaler.stds.len(),
                    schema.len()
                )));
            }
            if scaler
                .means
                .iter()
                .chain(scaler.stds.iter())
                .any(|v| !v.is_finite())
            {
                return Err(ServingError::corrupt("scaler parameters are not finite"));
            }
        }

        Ok(())
    }
}

/// Applies the frozen training-time transformations to incoming records.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: Arc<FeatureSchema>,
    spec: PreprocessingSpec,
}

impl Preprocessor {
    pub fn new(schema: Arc<FeatureSchema>, spec: PreprocessingSpec) -> ServingResult<Self> {
        schema.validate()?;
        spec.validate(&schema)?;
        Ok(Self { schema, spec })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn spec(&self) -> &PreprocessingSpec {
        &self.spec
    }

    /// Preprocess a single-object payload into a one-row batch.
    pub fn preprocess(&self, payload: &str) -> ServingResult<Vec<FeatureVector>> {
        let batch = RecordBatch::from_payload(payload)?;
        self.transform_batch(&batch)
    }

    pub fn transform_batch(&self, batch: &RecordBatch) -> ServingResult<Vec<FeatureVector>> {
        batch.iter().map(|r| self.transform_record(r)).collect()
    }

    /// Build the schema-ordered feature vector for one record.
    pub fn transform_record(&self, record: &Record) -> ServingResult<FeatureVector> {
        let calendar = match &self.spec.timestamp_field {
            Some(field) => match record.present(field) {
                Some(value) => Some(derive_calendar(field, value)?),
                None => None,
            },
            None => None,
        };

        let mut features = Vec::with_capacity(self.schema.len());
        for field in &self.schema.fields {
            let name = field.name.as_str();

            let derived = calendar.as_ref().and_then(|c| c.get(name));
            let value = match derived {
                Some(v) => Some(v),
                None => match record.present(name) {
                    Some(raw) if self.is_code_field(name) => Some(coerce_code(name, raw)?),
                    Some(raw) => Some(coerce_numeric(name, raw)?),
                    None => self.spec.fill_constants.get(name).copied(),
                },
            };

            match value {
                Some(v) => features.push(v),
                None => {
                    return Err(ServingError::schema(format!(
                        "missing required field `{}`",
                        name
                    )))
                }
            }
        }

        let vector = FeatureVector::new(features, self.schema.field_names())
            .map_err(|e| ServingError::schema(e.to_string()))?;

        match &self.spec.scaler {
            Some(scaler) => vector
                .standardize(&scaler.means, &scaler.stds)
                .map_err(|e| ServingError::schema(e.to_string())),
            None => Ok(vector),
        }
    }

    fn is_code_field(&self, name: &str) -> bool {
        self.spec.code_fields.iter().any(|c| c == name)
    }
}

/// Calendar fields derived from one timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
struct CalendarFeatures {
    year: i32,
    month: u32,
    day_of_month: u32,
    /// Monday = 0
    day_of_week: u32,
    hour: u32,
}

impl CalendarFeatures {
    fn from_naive(ts: NaiveDateTime) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
            day_of_month: ts.day(),
            day_of_week: ts.weekday().num_days_from_monday(),
            hour: ts.hour(),
        }
    }

    fn get(&self, name: &str) -> Option<f64> {
        match name {
            "Year" => Some(self.year as f64),
            "Month_of_year" => Some(self.month as f64),
            "Day_of_month" => Some(self.day_of_month as f64),
            "Day_of_week" => Some(self.day_of_week as f64),
            "Hour_of_day" => Some(self.hour as f64),
            _ => None,
        }
    }
}

fn derive_calendar(field: &str, value: &Value) -> ServingResult<CalendarFeatures> {
    let text = value.as_str().ok_or_else(|| {
        ServingError::schema(format!(
            "timestamp field `{}` must be a string, got {}",
            field,
            json_type_name(value)
        ))
    })?;
    parse_timestamp(text)
        .map(CalendarFeatures::from_naive)
        .ok_or_else(|| {
            ServingError::schema(format!(
                "timestamp field `{}` has unrecognised value `{}`",
                field, text
            ))
        })
}

/// Parse `YYYY-MM-DD HH:MM:SS` (the training data format, optionally with
/// fractional seconds or without seconds), RFC 3339, or a bare date taken
/// as midnight. RFC 3339 values keep their local wall-clock time.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// First run of ASCII digits in `text`, as an integer.
pub fn extract_code(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn coerce_code(name: &str, value: &Value) -> ServingResult<f64> {
    match value {
        Value::String(text) => extract_code(text).map(|c| c as f64).ok_or_else(|| {
            ServingError::schema(format!(
                "field `{}` has no numeric code in `{}`",
                name, text
            ))
        }),
        // integer codes: fractional parts are dropped, as for `"7.5"`
        other => coerce_numeric(name, other).map(f64::trunc),
    }
}

fn coerce_numeric(name: &str, value: &Value) -> ServingResult<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ServingError::schema(format!(
            "field `{}` is not numeric (got {})",
            name,
            json_type_name(value)
        ))),
    }
}
