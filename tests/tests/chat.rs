use stampede::prelude::*;
use stampede_runtime::ChatClient;
use stampede_tests::{init, nz, MockService};
use std::time::Duration;

fn config(requests: usize, workers: usize) -> RunConfig {
    RunConfig::new(nz(requests))
        .workers(nz(workers))
        .connections(nz(workers))
        .call_timeout(Duration::from_secs(5))
        .connect_timeout(Duration::from_secs(2))
}

async fn run(mock: &MockService, deployment: &str, config: RunConfig) -> RunReport {
    let client = ChatClient::new(&mock.target(deployment), &config).unwrap();
    let mut controller = RunController::new(config).unwrap();
    let report = controller.run(client).await;
    controller.shutdown().await;
    report
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn all_requests_succeed() {
    let mock = init();

    let report = run(mock, "ok", config(100, 10)).await;

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.success, 100);
    assert_eq!(report.failure, 0);
    assert_eq!(report.success_rate, 100.);
    assert!(report.requests_per_second.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn empty_choices_count_as_failures() {
    let mock = init();

    let report = run(mock, "empty", config(20, 5)).await;

    assert_eq!(report.success, 0);
    assert_eq!(report.failure, 20);
    assert_eq!(report.empty_response, 20);
    assert_eq!(report.transient_fault, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn server_errors_are_not_transient() {
    let mock = init();

    let report = run(mock, "error", config(20, 5)).await;

    assert_eq!(report.failure, 20);
    assert_eq!(report.transient_fault, 0);
    assert_eq!(report.failure_rate, 100.);
    assert!(!report.to_string().contains("WARNING"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn dropped_connections_are_transient() {
    let mock = init();
    let config = config(20, 5);
    let client = ChatClient::new(&mock.dropping_target(), &config).unwrap();
    let mut controller = RunController::new(config).unwrap();

    let report = controller.run(client).await;

    assert_eq!(report.success, 0);
    assert_eq!(report.failure, 20);
    assert_eq!(report.transient_fault, 20);
    assert_eq!(report.transient_fault_rate, 100.);
    assert!(report
        .to_string()
        .contains("WARNING: detected 20 transient network faults"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn outcomes_are_exported_as_metrics() {
    let mock = init();

    run(mock, "ok", config(10, 2)).await;

    let rendered = mock.metrics.render();
    assert!(rendered.contains("stampede_success"));
    assert!(rendered.contains("stampede_call_latency"));
}
