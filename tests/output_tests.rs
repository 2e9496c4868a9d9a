//! Tests for the output sink and per-task buffering.


use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use pgit::batch::BatchRunner;
use pgit::config::RunConfig;
use pgit::scheduler::CommandTemplate;
use pgit::worker::output::{announce, Stream};
use pgit::worker::{OutputSink, TaskOutput};
use pgit::PgitError;

use test_harness::{make_repo, sh, CapturedOutput};

#[tokio::test]
async fn test_blocks_reach_the_right_stream() {
    let output = CapturedOutput::new();

    output.handle.send(Stream::Stdout, "out 1\n".to_string());
    output.handle.send(Stream::Stderr, "err 1\n".to_string());
    output.handle.send(Stream::Stdout, "out 2\n".to_string());
    output.handle.send(Stream::Stdout, String::new());

    let (stdout, stderr) = output.finish().await;
    assert_eq!(stdout, "out 1\nout 2\n");
    assert_eq!(stderr, "err 1\n");
}

#[tokio::test]
async fn test_task_output_flushes_labelled_block() {
    let output = CapturedOutput::new();
    let command = sh("/work/alpha", "true");

    announce(&output.handle, &command);
    let mut task = TaskOutput::for_command(&command);
    task.push_stdout("one");
    task.push_stdout("two");
    task.push_stderr("warn");
    task.flush(&output.handle);

    let (stdout, stderr) = output.finish().await;
    assert_eq!(
        stdout,
        "[alpha] --> 'sh -c true' in '/work/alpha'\n[alpha] one\n[alpha] two\n"
    );
    assert_eq!(stderr, "[alpha] warn\n");
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_sink_reports_write_errors() {
    let (handle, sink) = OutputSink::spawn(FailingWriter, std::io::sink());
    handle.send(Stream::Stdout, "lost\n".to_string());
    drop(handle);

    let result = sink.await.unwrap();
    assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::BrokenPipe);
}

#[tokio::test]
async fn test_finish_reports_write_errors_as_output() {
    let (handle, sink) = OutputSink::spawn(FailingWriter, std::io::sink());
    handle.send(Stream::Stdout, "lost\n".to_string());
    drop(handle);

    match OutputSink::finish(sink).await {
        Err(PgitError::Output(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
        other => panic!("expected output error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_finish_after_clean_run() {
    let output = CapturedOutput::new();
    output.handle.send(Stream::Stdout, "ok\n".to_string());
    let CapturedOutput { handle, sink, stdout, .. } = output;
    drop(handle);

    assert!(OutputSink::finish(sink).await.is_ok());
    assert_eq!(stdout.contents(), "ok\n");
}

#[tokio::test]
async fn test_send_after_sink_stopped_is_dropped() {
    let (handle, sink) = OutputSink::spawn(FailingWriter, std::io::sink());
    handle.send(Stream::Stdout, "first\n".to_string());

    // Wait for the sink to hit the error and stop.
    let clone = handle.clone();
    drop(handle);
    tokio::time::sleep(Duration::from_millis(100)).await;
    clone.send(Stream::Stdout, "second\n".to_string());
    drop(clone);

    assert!(sink.await.unwrap().is_err());
}

/// Many tasks writing at once must still produce contiguous per-task blocks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_never_interleave() {
    let root = tempfile::TempDir::new().unwrap();
    let repos: Vec<_> = (0..8)
        .map(|i| make_repo(root.path(), &format!("t{}", i)))
        .collect();

    // Emit lines slowly enough that the tasks overlap in time.
    let script = "i=0; while [ $i -lt 50 ]; do echo \"line $i\"; i=$((i+1)); \
                  [ $((i % 10)) -eq 0 ] && sleep 0.01; done; exit 0";
    let config = RunConfig::new(
        root.path(),
        CommandTemplate::new("sh", vec!["-c".to_string(), script.to_string()]),
    )
    .with_concurrency(8);

    let output = CapturedOutput::new();
    let summary = BatchRunner::new(config)
        .run(repos, output.handle.clone())
        .await
        .unwrap();
    assert!(summary.is_success());
    let (stdout, _) = output.finish().await;

    // Track each label's output lines in order of appearance.
    let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
    let mut runs: Vec<String> = Vec::new();
    for line in stdout.lines() {
        assert!(line.starts_with('['), "unlabelled line: {:?}", line);
        let end = line.find("] ").expect("label terminator");
        let label = line[1..end].to_string();
        let body = &line[end + 2..];
        if body.starts_with("-->") {
            continue;
        }

        let n: usize = body
            .strip_prefix("line ")
            .and_then(|n| n.parse().ok())
            .unwrap_or_else(|| panic!("corrupted line: {:?}", line));
        seen.entry(label.clone()).or_default().push(n);
        if runs.last() != Some(&label) {
            runs.push(label);
        }
    }

    assert_eq!(seen.len(), 8);
    for (label, lines) in &seen {
        assert_eq!(lines, &(0..50).collect::<Vec<_>>(), "out of order for {}", label);
    }
    // One contiguous run of output per task.
    assert_eq!(runs.len(), 8, "interleaved runs: {:?}", runs);
}
