use axum::{body::Bytes, extract::rejection::BytesRejection, extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::{
    api::{error::ApiError, response::ApiResponse, AppState},
    error::{ServingError, ServingResult},
    features::FeatureSchema,
    ml::ModelMetadata,
};

/// Prediction response data
#[derive(Debug, Serialize)]
pub struct PredictionData {
    /// Forecast load shortfall, one value per record
    pub prediction: Vec<f64>,
    pub model_id: String,
    pub request_id: Uuid,
}

/// Loaded model description
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub metadata: ModelMetadata,
    pub schema: FeatureSchema,
    pub timestamp_field: Option<String>,
    pub code_fields: Vec<String>,
    pub fill_constants: BTreeMap<String, f64>,
    pub standardized: bool,
}

fn utf8(body: &Bytes) -> ServingResult<&str> {
    std::str::from_utf8(body).map_err(|e| ServingError::malformed(format!("body is not UTF-8: {}", e)))
}

async fn serve<F>(
    state: AppState,
    route: &'static str,
    body: Bytes,
    predict: F,
) -> Result<ApiResponse<PredictionData>, ApiError>
where
    F: FnOnce(&AppState, &str) -> ServingResult<Vec<f64>>,
{
    let request_id = Uuid::new_v4();
    let span = info_span!("predict", %request_id, route, bytes = body.len());

    async move {
        let start = Instant::now();
        let prediction = utf8(&body).and_then(|payload| predict(&state, payload))?;
        let elapsed_us = start.elapsed().as_micros() as u64;

        tracing::info!(records = prediction.len(), elapsed_us, "prediction served");

        let records = prediction.len();
        Ok(ApiResponse::success(PredictionData {
            prediction,
            model_id: state.service.metadata().model_id.clone(),
            request_id,
        })
        .with_records(records)
        .with_duration_us(elapsed_us))
    }
    .instrument(span)
    .await
}

/// POST /api/v1/predict - Predict the shortfall for one JSON record
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<ApiResponse<PredictionData>, ApiError> {
    serve(state, "predict", body?, |st, payload| st.service.make_prediction(payload)).await
}

/// POST /api/v1/predict/batch - Predict for a JSON array of records
pub async fn predict_batch(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<ApiResponse<PredictionData>, ApiError> {
    serve(state, "predict_batch", body?, |st, payload| st.service.predict_batch(payload)).await
}

/// GET /api/v1/model - Describe the loaded artifact
pub async fn model_info(State(state): State<AppState>) -> Json<ApiResponse<ModelInfo>> {
    let service = &state.service;
    let spec = service.preprocessor().spec();

    Json(ApiResponse::success(ModelInfo {
        metadata: service.metadata().clone(),
        schema: service.schema().clone(),
        timestamp_field: spec.timestamp_field.clone(),
        code_fields: spec.code_fields.clone(),
        fill_constants: spec.fill_constants.clone(),
        standardized: spec.scaler.is_some(),
    }))
}
