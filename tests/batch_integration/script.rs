//! Script executor end to end.

use std::io::Write;

use fanout::unit::ScriptExecutor;

use crate::common::*;

fn write_script(dir: &tempfile::TempDir, body: &str) -> String {
    let path = dir.path().join("unit.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{body}").unwrap();
    path.to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_script_batch_runs_each_ref_once() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("runs.log");
    let script = write_script(
        &dir,
        &format!(
            "echo \"$1\" >> {log}\nif [ \"$1\" = \"2614\" ]; then exit 4; fi\necho \"processed $1\"",
            log = log.display()
        ),
    );

    let executor = Arc::new(ScriptExecutor::new("sh", vec![script]));
    let substrate: Arc<dyn Substrate> =
        Arc::new(LocalSubstrate::new(executor, RetryPolicy::fast(3)));
    let orchestrator = BatchOrchestrator::new(substrate, BatchOptions::new(3));

    let result = orchestrator.run_batch(inputs(&order_refs())).await.unwrap();

    assert_aligned(&result);
    assert_eq!(result.success_count, 9);
    assert_eq!(result.fail_count, 1);

    let failed = &result.results[3];
    assert_eq!(failed.order_ref, "2614");
    assert_eq!(failed.exit_code, Some(4));
    assert_eq!(failed.error_message, "script failed with exit code: 4");
    assert_eq!(result.results[0].output.trim(), "processed 7307");

    let runs = std::fs::read_to_string(&log).unwrap();
    let mut lines: Vec<&str> = runs.lines().collect();
    lines.sort_unstable();
    let mut expected = order_refs();
    expected.sort_unstable();
    assert_eq!(lines, expected);
}
