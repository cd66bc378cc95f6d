use stampede::prelude::*;
use stampede_runtime::ChatClient;
use stampede_tests::{init, nz};
use std::time::Duration;

// NOTE: Kept in its own binary so no other test sends requests to the mock service meanwhile.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn deadline_reports_partial_results() {
    let mock = init();
    let config = RunConfig::new(nz(40))
        .workers(nz(2))
        .connections(nz(2))
        .call_timeout(Duration::from_secs(5))
        .deadline(Duration::from_millis(500))
        .shutdown_grace(Duration::ZERO);
    let client = ChatClient::new(&mock.target("ok-200"), &config).unwrap();
    let mut controller = RunController::new(config).unwrap();

    let handled_before = mock_service::request_count();
    let report = controller.run(client).await;
    controller.shutdown().await;
    let handled = mock_service::request_count() - handled_before;

    assert_eq!(report.state, RunState::TimedOut);
    assert_eq!(report.total_requests, 40);
    assert!(report.completed() < 40);
    assert!(report.to_string().contains("COMPLETED BEFORE DEADLINE"));

    // Only requests a worker got to before the deadline reached the service.
    assert!(handled >= report.completed());
    assert!(handled < 40, "service handled {handled} requests");
}
