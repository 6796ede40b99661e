//! Feature handling for load shortfall requests
//!
//! Decodes request payloads into records and turns them into feature
//! vectors matching the schema a model was trained on.

pub mod preprocess;
pub mod record;
pub mod schema;

pub use preprocess::{extract_code, PreprocessingSpec, Preprocessor, Standardizer};
pub use record::{Record, RecordBatch};
pub use schema::{FeatureField, FeatureKind, FeatureSchema, LOAD_SHORTFALL_V1};
