//! Concurrency bound against the local substrate.

use crate::common::*;

#[tokio::test]
async fn test_peak_executions_bounded_by_max_concurrent() {
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(25)));
    let substrate = local_substrate(Arc::clone(&executor), ReusePolicy::RejectDuplicate);

    let result = assert_ok!(orchestrator(substrate, 2).run_batch(inputs(&order_refs())).await);

    assert_aligned(&result);
    assert_eq!(result.success_count, 10);
    assert_eq!(executor.peak(), 2);
    assert_eq!(executor.total_calls(), 10);
}

#[tokio::test]
async fn test_zero_max_concurrent_runs_three_at_a_time() {
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(25)));
    let substrate = local_substrate(Arc::clone(&executor), ReusePolicy::RejectDuplicate);

    let result = orchestrator(substrate, 0)
        .run_batch(inputs(&order_refs()))
        .await
        .unwrap();

    assert_aligned(&result);
    assert_eq!(executor.peak(), 3);
}

#[tokio::test]
async fn test_retries_stay_within_one_slot() {
    let executor = Arc::new(
        RecordingExecutor::new(Duration::from_millis(5))
            .flaky("7307")
            .flaky("2614"),
    );
    let substrate = local_substrate(Arc::clone(&executor), ReusePolicy::RejectDuplicate);

    let result = orchestrator(Arc::clone(&substrate), 1)
        .run_batch(inputs(&order_refs()))
        .await
        .unwrap();

    assert_eq!(result.success_count, 10);
    assert_eq!(executor.peak(), 1);
    assert_eq!(executor.calls("7307"), 2);
    assert_eq!(executor.calls("5493"), 1);
    // Retries are attempts of one execution, not new executions
    assert_eq!(substrate.execution_count(&key("7307")), 1);
}
