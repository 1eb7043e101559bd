//! Duplicate-start handling across batches sharing one substrate.

use crate::common::*;

#[tokio::test]
async fn test_resubmitted_batch_is_all_duplicates() {
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(5)));
    let substrate = local_substrate(Arc::clone(&executor), ReusePolicy::RejectDuplicate);
    let orchestrator = orchestrator(Arc::clone(&substrate), 3);

    let first = orchestrator.run_batch(inputs(&order_refs())).await.unwrap();
    let second = orchestrator.run_batch(inputs(&order_refs())).await.unwrap();

    assert_eq!(first.duplicate_count(), 0);
    assert_aligned(&second);
    assert_eq!(second.success_count, 10);
    assert_eq!(second.duplicate_count(), 10);
    assert!(second
        .results
        .iter()
        .all(|r| r.error_message == DUPLICATE_START_MESSAGE));
    assert_eq!(executor.total_calls(), 10);
}

#[tokio::test]
async fn test_allow_duplicate_reexecutes_after_completion() {
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(5)));
    let substrate = local_substrate(Arc::clone(&executor), ReusePolicy::AllowDuplicate);
    let orchestrator = orchestrator(Arc::clone(&substrate), 3);

    orchestrator.run_batch(inputs(&["7307", "5493"])).await.unwrap();
    let second = orchestrator.run_batch(inputs(&["7307", "5493"])).await.unwrap();

    assert_eq!(second.duplicate_count(), 0);
    assert_eq!(executor.calls("7307"), 2);
    assert_eq!(substrate.execution_count(&key("7307")), 2);
}

#[tokio::test]
async fn test_overlapping_batches_never_double_start_a_key() {
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(20)));
    let substrate = local_substrate(Arc::clone(&executor), ReusePolicy::AllowDuplicate);
    let left = orchestrator(Arc::clone(&substrate), 3);
    let right = orchestrator(Arc::clone(&substrate), 3);

    let (a, b) = tokio::join!(
        left.run_batch(inputs(&order_refs())),
        right.run_batch(inputs(&order_refs()))
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_aligned(&a);
    assert_aligned(&b);
    assert_eq!(a.success_count + b.success_count, 20);
    for (index, order_ref) in order_refs().into_iter().enumerate() {
        let duplicates =
            a.results[index].is_duplicate() as usize + b.results[index].is_duplicate() as usize;
        assert!(duplicates <= 1, "{order_ref} reported as duplicate by both batches");
        assert_eq!(
            executor.calls(order_ref),
            2 - duplicates,
            "{order_ref} executed once per accepted dispatch"
        );
    }
}

#[tokio::test]
async fn test_overlapping_batches_reject_duplicate_run_once() {
    let executor = Arc::new(RecordingExecutor::new(Duration::from_millis(10)));
    let substrate = local_substrate(Arc::clone(&executor), ReusePolicy::RejectDuplicate);
    let left = orchestrator(Arc::clone(&substrate), 2);
    let right = orchestrator(Arc::clone(&substrate), 4);

    let (a, b) = tokio::join!(
        left.run_batch(inputs(&order_refs())),
        right.run_batch(inputs(&order_refs()))
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    for (index, order_ref) in order_refs().into_iter().enumerate() {
        assert_eq!(executor.calls(order_ref), 1);
        assert!(a.results[index].is_duplicate() ^ b.results[index].is_duplicate());
    }
    assert_eq!(a.duplicate_count() + b.duplicate_count(), 10);
}
