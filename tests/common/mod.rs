#![allow(dead_code)]
//! Shared fixtures: artifacts over the built-in schema and sample payloads.

use load_shortfall_service::features::{FeatureSchema, PreprocessingSpec};
use load_shortfall_service::ml::artifact::{ArtifactModel, ModelArtifact};
use load_shortfall_service::ml::models::{DecisionTreeModel, LinearRegressionModel, RandomForestModel, TreeNode};
use load_shortfall_service::ml::{ModelMetadata, ModelType, ValidationMetrics};
use load_shortfall_service::ShortfallService;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Training-set mean of `Valencia_pressure`
pub const VALENCIA_PRESSURE_MEAN: f64 = 1012.0514065222828;

/// Weather columns that must be supplied by every request
pub const REQUIRED_WEATHER_FIELDS: [&str; 30] = [
    "Madrid_wind_speed",
    "Valencia_wind_deg",
    "Bilbao_rain_1h",
    "Valencia_wind_speed",
    "Seville_humidity",
    "Madrid_humidity",
    "Bilbao_clouds_all",
    "Bilbao_wind_speed",
    "Seville_clouds_all",
    "Bilbao_wind_deg",
    "Barcelona_wind_speed",
    "Barcelona_wind_deg",
    "Madrid_clouds_all",
    "Seville_wind_speed",
    "Barcelona_rain_1h",
    "Seville_pressure",
    "Seville_rain_1h",
    "Bilbao_snow_3h",
    "Barcelona_pressure",
    "Seville_rain_3h",
    "Madrid_rain_1h",
    "Barcelona_rain_3h",
    "Valencia_snow_3h",
    "Madrid_weather_id",
    "Barcelona_weather_id",
    "Bilbao_pressure",
    "Seville_weather_id",
    "Seville_temp_max",
    "Bilbao_weather_id",
    "Valencia_humidity",
];

fn metadata(model_type: ModelType) -> ModelMetadata {
    ModelMetadata {
        model_id: format!("test-{}", model_type).to_lowercase(),
        model_type,
        version: "1.0.0".to_string(),
        trained_at: chrono::Utc::now(),
        training_samples: 7010,
        validation_metrics: ValidationMetrics::new(3900.0, 4900.0, 45.0, 0.12),
        feature_names: FeatureSchema::builtin().field_names(),
    }
}

fn spec() -> PreprocessingSpec {
    PreprocessingSpec::for_schema(FeatureSchema::builtin())
        .with_fill_constant("Valencia_pressure", VALENCIA_PRESSURE_MEAN)
}

/// prediction = -100·Madrid_wind_speed + 10·Valencia_wind_deg
///            + Valencia_pressure + 50·Hour_of_day
pub fn linear_artifact() -> ModelArtifact {
    let schema = FeatureSchema::builtin();
    let mut coefficients = vec![0.0; schema.len()];
    for (name, weight) in [
        ("Madrid_wind_speed", -100.0),
        ("Valencia_wind_deg", 10.0),
        ("Valencia_pressure", 1.0),
        ("Hour_of_day", 50.0),
    ] {
        coefficients[schema.index_of(name).unwrap()] = weight;
    }

    ModelArtifact {
        metadata: metadata(ModelType::LinearRegression),
        schema: schema.clone(),
        preprocessing: spec(),
        model: ArtifactModel::Linear(LinearRegressionModel::new(coefficients, 0.0)),
    }
}

/// Two trees splitting on the hour of day and Seville pressure code
pub fn forest_artifact() -> ModelArtifact {
    let schema = FeatureSchema::builtin();
    let n = schema.len();
    let hour = schema.index_of("Hour_of_day").unwrap();
    let pressure = schema.index_of("Seville_pressure").unwrap();

    let by_hour = DecisionTreeModel::new(
        n,
        vec![
            TreeNode::Split {
                feature: hour,
                threshold: 11.5,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 8000.0 },
            TreeNode::Leaf { value: 12000.0 },
        ],
    );
    let by_pressure = DecisionTreeModel::new(
        n,
        vec![
            TreeNode::Split {
                feature: pressure,
                threshold: 12.5,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 9000.0 },
            TreeNode::Leaf { value: 11000.0 },
        ],
    );

    ModelArtifact {
        metadata: metadata(ModelType::RandomForest),
        schema: schema.clone(),
        preprocessing: spec(),
        model: ArtifactModel::RandomForest(RandomForestModel::new(vec![by_hour, by_pressure])),
    }
}

pub fn linear_service() -> ShortfallService {
    ShortfallService::from_artifact(linear_artifact()).unwrap()
}

pub fn write_artifact(dir: &Path, artifact: &ModelArtifact) -> PathBuf {
    let path = dir.join(format!("{}.lsfa", artifact.metadata.model_id));
    artifact.save(&path).unwrap();
    path
}

/// A complete request record for 2017-01-01 03:00 (a Sunday)
pub fn payload_map() -> Map<String, Value> {
    let mut map = Map::new();
    for name in REQUIRED_WEATHER_FIELDS {
        map.insert(name.to_string(), json!(1.0));
    }
    map.insert("Madrid_wind_speed".to_string(), json!(2.0));
    map.insert("Valencia_wind_deg".to_string(), json!("level_7"));
    map.insert("Seville_pressure".to_string(), json!("sp25"));
    map.insert("Barcelona_pressure".to_string(), json!("1017.33"));
    map.insert("Valencia_pressure".to_string(), json!(1002.0));
    map.insert("time".to_string(), json!("2017-01-01 03:00:00"));
    map
}

pub fn payload() -> String {
    Value::Object(payload_map()).to_string()
}

/// Expected linear prediction for [`payload`]: -200 + 70 + 1002 + 150
pub const PAYLOAD_PREDICTION: f64 = 1022.0;
