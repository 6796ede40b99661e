//! Request records
//!
//! A record is one flat key/value observation decoded from a JSON payload.
//! Records are always handled as a batch, even when the payload carries a
//! single object, so batch-capable models see a uniform shape.

use serde_json::{Map, Value};

use crate::error::{ServingError, ServingResult};

/// One flat key/value observation
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Map<String, Value>,
}

impl Record {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value for `key`, treating JSON `null` the same as an absent key
    pub fn present(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(|k| k.as_str())
    }
}

/// An ordered sequence of records
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    records: Vec<Record>,
}

impl RecordBatch {
    /// Lift a single record into a one-row batch
    pub fn single(record: Record) -> Self {
        Self {
            records: vec![record],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Decode a payload that must hold exactly one JSON object.
    pub fn from_payload(payload: &str) -> ServingResult<Self> {
        match parse_json(payload)? {
            Value::Object(map) => Ok(Self::single(Record::new(map))),
            other => Err(ServingError::malformed(format!(
                "expected a single JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Decode a payload holding a non-empty JSON array of objects.
    pub fn from_batch_payload(payload: &str) -> ServingResult<Self> {
        let items = match parse_json(payload)? {
            Value::Array(items) => items,
            other => {
                return Err(ServingError::malformed(format!(
                    "expected a JSON array of objects, got {}",
                    json_type_name(&other)
                )))
            }
        };

        if items.is_empty() {
            return Err(ServingError::malformed("batch payload contains no records"));
        }

        let records = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(Record::new(map)),
                other => Err(ServingError::malformed(format!(
                    "batch item {} is {}, expected an object",
                    i,
                    json_type_name(&other)
                ))),
            })
            .collect::<ServingResult<Vec<_>>>()?;

        Ok(Self { records })
    }
}

impl<'a> IntoIterator for &'a RecordBatch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn parse_json(payload: &str) -> ServingResult<Value> {
    serde_json::from_str(payload)
        .map_err(|e| ServingError::malformed(format!("payload is not valid JSON: {}", e)))
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
