use axum::{
    routing::{get, post},
    Router,
};

use crate::api::{predict, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict::predict))
        .route("/predict/batch", post(predict::predict_batch))
        .route("/model", get(predict::model_info))
        .with_state(state)
}
