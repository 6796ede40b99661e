use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Response timestamp
    pub timestamp: DateTime<Utc>,
    /// Request metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

/// Additional metadata about the response
#[derive(Debug, Default, Serialize)]
pub struct ResponseMetadata {
    /// Number of records predicted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    /// Processing duration in microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful response with data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Add record count to metadata
    pub fn with_records(mut self, records: usize) -> Self {
        self.metadata.get_or_insert_with(Default::default).records = Some(records);
        self
    }

    /// Add processing duration to metadata
    pub fn with_duration_us(mut self, duration_us: u64) -> Self {
        self.metadata.get_or_insert_with(Default::default).duration_us = Some(duration_us);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.metadata.is_none());
    }

    #[test]
    fn test_response_with_metadata() {
        let response = ApiResponse::success(vec![4521.37])
            .with_records(1)
            .with_duration_us(85);

        let metadata = response.metadata.unwrap();
        assert_eq!(metadata.records, Some(1));
        assert_eq!(metadata.duration_us, Some(85));
    }

    #[test]
    fn test_metadata_omitted_from_json_when_absent() {
        let json = serde_json::to_value(ApiResponse::success(1.5)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 1.5);
        assert!(json.get("metadata").is_none());
    }
}
