use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use workload_bench::{LoadDriver, RequestOutcome, Target, TargetClient, ThroughputStats};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Shuffling the collected outcomes must not change any statistic.
#[test]
fn stats_are_independent_of_completion_order() {
    let mut rng = rand::thread_rng();
    let mut outcomes: Vec<RequestOutcome> = (0..200)
        .map(|i| {
            let elapsed = Duration::from_micros(rng.gen_range(100..50_000));
            if i % 9 == 0 {
                RequestOutcome::failed(elapsed, "request timed out after 10s")
            } else {
                RequestOutcome::from_status(200, elapsed)
            }
        })
        .collect();
    let wall_time = Duration::from_millis(750);

    let reference = ThroughputStats::from_outcomes(&outcomes, 200, wall_time);
    for _ in 0..10 {
        outcomes.shuffle(&mut rng);
        assert_eq!(
            ThroughputStats::from_outcomes(&outcomes, 200, wall_time),
            reference
        );
    }
}

#[test]
fn all_successful_stats_match_plain_mean_min_max() {
    let times_ms = [12u64, 7, 31, 18, 2, 44, 9, 23];
    let outcomes: Vec<RequestOutcome> = times_ms
        .iter()
        .map(|&ms| RequestOutcome::from_status(200, Duration::from_millis(ms)))
        .collect();

    let stats = ThroughputStats::from_outcomes(&outcomes, times_ms.len(), Duration::from_secs(1));

    let sum: u64 = times_ms.iter().sum();
    assert_eq!(
        stats.avg_response_time,
        Duration::from_millis(sum) / times_ms.len() as u32
    );
    assert_eq!(stats.min_response_time, Duration::from_millis(2));
    assert_eq!(stats.max_response_time, Duration::from_millis(44));
    assert_eq!(stats.success_rate, 100.0);
}

/// 100 requests against a target that fails the first 7 it sees.
#[tokio::test]
async fn partial_failures_lower_success_rate_exactly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(7)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"message\": \"Hello, World!\"}"))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = TargetClient::new(Target::parse(&server.uri()).unwrap()).unwrap();
    let stats = LoadDriver::new(client)
        .run("/", 100, 10, Duration::from_secs(10))
        .await;

    assert_eq!(stats.total_requests, 100);
    assert_eq!(stats.successful_requests, 93);
    assert_eq!(stats.success_rate, 93.0);
    assert!(stats.throughput_rps > 0.0);
    assert!(stats.min_response_time <= stats.avg_response_time);
    assert!(stats.avg_response_time <= stats.max_response_time);
}

/// Throughput is successes over the burst's wall time, not over summed latency.
#[tokio::test]
async fn throughput_is_measured_over_wall_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .mount(&server)
        .await;

    let client = TargetClient::new(Target::parse(&server.uri()).unwrap()).unwrap();
    let stats = LoadDriver::new(client)
        .run("/", 20, 10, Duration::from_secs(5))
        .await;

    let summed: f64 = stats.avg_response_time.as_secs_f64() * stats.successful_requests as f64;
    assert_eq!(stats.successful_requests, 20);
    assert!(stats.wall_time.as_secs_f64() < summed);
    let expected = stats.successful_requests as f64 / stats.wall_time.as_secs_f64();
    assert!((stats.throughput_rps - expected).abs() < 1e-9);
}
