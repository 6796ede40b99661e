//! Load Testing Suite
//!
//! Verifies that one shared prediction service behaves under concurrency:
//! - Many concurrent clients receive identical predictions
//! - Rejected requests interleaved with valid ones leave no trace
//! - Latency stays bounded under sustained load

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use load_shortfall_service::{ServingError, ShortfallService};
use serde_json::Value;

use crate::common::*;

fn shared_service() -> Arc<ShortfallService> {
    Arc::new(ShortfallService::from_artifact(forest_artifact()).unwrap())
}

fn incomplete_payload() -> String {
    let mut map = payload_map();
    map.remove("Seville_pressure");
    Value::Object(map).to_string()
}

/// Test: Concurrent clients share one service
///
/// 32 clients predict the same record; every answer must be bit-identical.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_predictions_are_identical() {
    let service = shared_service();
    let expected = service.make_prediction(&payload()).unwrap()[0].to_bits();

    let mut tasks = JoinSet::new();
    for _ in 0..32 {
        let svc = Arc::clone(&service);
        tasks.spawn(async move {
            let body = payload();
            (0..20)
                .map(|_| svc.make_prediction(&body).unwrap()[0].to_bits())
                .collect::<Vec<_>>()
        });
    }

    while let Some(result) = tasks.join_next().await {
        let bits = result.expect("Task should complete successfully");
        assert!(bits.iter().all(|b| *b == expected));
    }
}

/// Test: Bad requests interleaved with good ones
///
/// Half the clients send malformed or incomplete payloads. The valid
/// clients must never observe an error or a changed prediction.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rejections_do_not_leak_between_requests() {
    let service = shared_service();
    let expected = service.make_prediction(&payload()).unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..16 {
        let svc = Arc::clone(&service);
        let expected = expected.clone();
        tasks.spawn(async move {
            for _ in 0..25 {
                if i % 2 == 0 {
                    assert_eq!(svc.make_prediction(&payload()).unwrap(), expected);
                } else {
                    let malformed = svc.make_prediction("{not-json");
                    assert!(matches!(malformed, Err(ServingError::PayloadMalformed(_))));
                    let incomplete = svc.make_prediction(&incomplete_payload());
                    assert!(matches!(incomplete, Err(ServingError::SchemaMismatch(_))));
                }
                tokio::task::yield_now().await;
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        result.expect("Task should complete without panic");
    }
}

/// Test: Prediction latency under sustained load
///
/// 50 concurrent clients; a single prediction must stay well under 100ms.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_latency_under_load() {
    let service = shared_service();

    let mut tasks = JoinSet::new();
    for _ in 0..50 {
        let svc = Arc::clone(&service);
        tasks.spawn(async move {
            let body = payload();
            let mut worst = Duration::ZERO;
            for _ in 0..200 {
                let start = Instant::now();
                let _ = svc.make_prediction(&body);
                worst = worst.max(start.elapsed());
                tokio::time::sleep(Duration::from_micros(100)).await;
            }
            worst
        });
    }

    let mut max_latency = Duration::ZERO;
    while let Some(result) = tasks.join_next().await {
        max_latency = max_latency.max(result.expect("Client should finish"));
    }

    println!("Prediction latency - Max: {:?}", max_latency);
    assert!(
        max_latency < Duration::from_millis(100),
        "Prediction latency exceeded 100ms: {:?}",
        max_latency
    );
}

/// Benchmark: Throughput test
///
/// Measures how many batch predictions the service handles per second.
#[tokio::test]
#[ignore] // Ignore by default as this is a slow test
async fn test_throughput_benchmark() {
    let service = shared_service();
    let batch = Value::Array(vec![Value::Object(payload_map()); 16]).to_string();

    let start = Instant::now();
    let test_duration = Duration::from_secs(5);
    let mut records = 0usize;

    while start.elapsed() < test_duration {
        records += service.predict_batch(&batch).unwrap().len();
    }

    let elapsed = start.elapsed();
    let per_second = records as f64 / elapsed.as_secs_f64();

    println!(
        "Throughput: {:.0} records/second ({} records in {:?})",
        per_second, records, elapsed
    );

    assert!(
        per_second > 1000.0,
        "Throughput too low: {:.0} records/s",
        per_second
    );
}
