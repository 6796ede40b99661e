//! Load shortfall prediction service
//!
//! Serves a model trained offline to forecast Spain's three-hourly
//! electricity load shortfall from city weather observations. The artifact
//! is loaded once at startup; each request is decoded, preprocessed with the
//! constants frozen at training time and handed to the model.

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod ml;
pub mod telemetry;

pub use error::{ServingError, ServingResult};
pub use ml::inference::ShortfallService;
