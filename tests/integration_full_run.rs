//! End-to-end runs of the whole phase sequence against mock targets.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use workload_bench::{
    BenchmarkConfig, BenchmarkReport, BenchmarkRunner, Phase, ResourceProbe, ResourceSample,
    ResultsManager,
};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedProbe;

#[async_trait]
impl ResourceProbe for FixedProbe {
    async fn sample(&self) -> ResourceSample {
        ResourceSample::new(12.0, 40.0)
    }

    async fn sample_over(&self, _interval: Duration) -> ResourceSample {
        ResourceSample::new(12.0, 40.0)
    }
}

fn fast_config(target_url: String) -> BenchmarkConfig {
    BenchmarkConfig {
        target_url,
        total_requests: 6,
        concurrency: 3,
        request_timeout: Duration::from_millis(200),
        health_timeout: Duration::from_millis(200),
        task_timeout: Duration::from_millis(200),
        startup_attempts: 3,
        startup_interval: Duration::from_millis(10),
        startup_timeout: Duration::from_millis(200),
        baseline_interval: Duration::from_millis(10),
        ..BenchmarkConfig::default()
    }
}

fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn expected_keys() -> Vec<&'static str> {
    Phase::ALL
        .iter()
        .flat_map(|phase| phase.report_keys().iter().copied())
        .collect()
}

fn number(report: &BenchmarkReport, key: &str) -> f64 {
    report
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or_else(|| panic!("{} is not a number", key))
}

#[tokio::test]
async fn dead_target_still_produces_a_complete_zeroed_report() {
    let runner =
        BenchmarkRunner::with_probe(fast_config(unused_local_url()), Arc::new(FixedProbe))
            .unwrap();

    let report = runner.run().await.unwrap();

    let keys: Vec<&str> = report.keys().collect();
    assert_eq!(keys, expected_keys());

    // Startup reports the time spent giving up.
    assert!(number(&report, "startup_time") > 0.0);
    for key in [
        "memory_usage_idle",
        "cpu_usage_idle",
        "cpu_execution_time",
        "cpu_usage_under_load",
        "throughput_rps",
        "avg_response_time",
        "min_response_time",
        "max_response_time",
        "success_rate",
        "successful_requests",
        "parallel_execution_time",
        "parallel_cpu_usage",
        "memory_execution_time",
        "memory_usage_peak",
        "memory_items_created",
    ] {
        assert_eq!(number(&report, key), 0.0, "{} should be zero", key);
    }
    assert_eq!(report.get("total_requests"), Some(&json!(6)));
    assert_eq!(report.get("parallel_results"), Some(&json!([])));
}

/// Only the health endpoint answers; everything else hangs past its timeout.
#[tokio::test]
async fn health_only_target_populates_reachable_phases() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "memory_usage": 21.5,
            "cpu_usage": 3.25
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .with_priority(10)
        .mount(&server)
        .await;

    let runner =
        BenchmarkRunner::with_probe(fast_config(server.uri()), Arc::new(FixedProbe)).unwrap();
    let report = runner.run().await.unwrap();

    let keys: Vec<&str> = report.keys().collect();
    assert_eq!(keys, expected_keys());

    assert!(number(&report, "startup_time") >= 0.0);
    assert_eq!(number(&report, "memory_usage_idle"), 21.5);
    assert_eq!(number(&report, "cpu_usage_idle"), 3.25);

    assert_eq!(number(&report, "cpu_execution_time"), 0.0);
    assert_eq!(number(&report, "success_rate"), 0.0);
    assert_eq!(number(&report, "throughput_rps"), 0.0);
    assert_eq!(number(&report, "parallel_execution_time"), 0.0);
    assert_eq!(number(&report, "memory_items_created"), 0.0);
}

#[tokio::test]
async fn healthy_target_report_round_trips_through_disk() {
    let server = MockServer::start().await;
    let routes = [
        ("/health", json!({"status": "healthy", "memory_usage": 10.0, "cpu_usage": 1.0})),
        ("/cpu-intensive", json!({"execution_time": 0.8, "cpu_usage": 95.5, "result": 12345})),
        ("/", json!({"message": "Hello, World!"})),
        (
            "/parallel-task",
            json!({"execution_time": 0.4, "cpu_usage": 88.0, "results": [1, 2, 3, 4]}),
        ),
        ("/memory-test", json!({"execution_time": 0.2, "memory_usage": 33.0, "items_created": 100000})),
    ];
    for (route, body) in routes {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let runner =
        BenchmarkRunner::with_probe(fast_config(server.uri()), Arc::new(FixedProbe)).unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(number(&report, "cpu_execution_time"), 0.8);
    assert_eq!(number(&report, "cpu_usage_under_load"), 95.5);
    assert_eq!(number(&report, "success_rate"), 100.0);
    assert_eq!(report.get("successful_requests"), Some(&json!(6)));
    assert_eq!(report.get("parallel_results"), Some(&json!([1, 2, 3, 4])));
    assert_eq!(report.get("memory_items_created"), Some(&json!(100000)));
    assert_eq!(report.owner_of("success_rate"), Some(Phase::Throughput));

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("benchmark_results.json");
    let written = ResultsManager::new(&output).finalize(&report).unwrap();
    assert_eq!(written, output);

    let document: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let object = document.as_object().unwrap();
    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    assert_eq!(keys, expected_keys());
    assert_eq!(object["memory_usage_peak"], json!(33.0));
}
