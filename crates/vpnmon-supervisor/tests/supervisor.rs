use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use vpnmon_supervisor::{
    ClientCommand, IterationOutcome, OutputSink, ProcessLauncher, ProcessRunner,
    ProcessSupervisor, SupervisorConfig, SupervisorError, SupervisorEvent,
};

/// Fails, panics, then exits cleanly, in rotation
struct Flaky {
    calls: Arc<AtomicUsize>,
}

impl ProcessRunner for Flaky {
    fn run<S: OutputSink>(
        &self,
        _command: &ClientCommand,
        _sink: &mut S,
    ) -> impl Future<Output = Result<Option<i32>, SupervisorError>> + Send {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            match n % 3 {
                0 => Err(SupervisorError::Io(std::io::Error::other("pipe broke"))),
                1 => panic!("client wrapper blew up"),
                _ => Ok(Some(1)),
            }
        }
    }
}

async fn completed(handle: &mut vpnmon_supervisor::SupervisorHandle, count: usize) -> Vec<IterationOutcome> {
    let mut outcomes = Vec::new();
    while outcomes.len() < count {
        match handle.next_event().await {
            Some(SupervisorEvent::IterationComplete { outcome, .. }) => outcomes.push(outcome),
            Some(_) => {}
            None => break,
        }
    }
    outcomes
}

#[tokio::test(start_paused = true)]
async fn failures_and_panics_do_not_escape_the_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runner = Flaky {
        calls: Arc::clone(&calls),
    };
    let (sink, _lines) = mpsc::unbounded_channel::<String>();
    let mut handle = ProcessSupervisor::spawn(
        runner,
        ClientCommand::new("vpn-ws-client", ["--no-verify", "tap0", "wss://vpn.example.net"]),
        sink,
        SupervisorConfig::default(),
    );

    let outcomes = completed(&mut handle, 6).await;

    assert_eq!(outcomes.len(), 6);
    assert!(matches!(&outcomes[0], IterationOutcome::Failed { error } if error.contains("pipe broke")));
    assert!(matches!(&outcomes[1], IterationOutcome::Failed { error } if error.contains("panicked")));
    assert_eq!(outcomes[2], IterationOutcome::Exited { code: Some(1) });
    assert!(matches!(&outcomes[3], IterationOutcome::Failed { .. }));

    handle.shutdown();
    handle.join().await.unwrap();
    assert!(calls.load(Ordering::SeqCst) >= 6);
}

#[tokio::test]
async fn missing_executable_is_retried() {
    let (sink, _lines) = mpsc::unbounded_channel::<String>();
    let mut handle = ProcessSupervisor::spawn(
        ProcessLauncher,
        ClientCommand::new("/nonexistent/vpn-ws-client", ["--no-verify"]),
        sink,
        SupervisorConfig {
            restart_delay: Duration::from_millis(10),
        },
    );

    let outcomes = completed(&mut handle, 2).await;
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(
            matches!(outcome, IterationOutcome::Failed { error } if error.contains("failed to launch"))
        );
    }

    handle.shutdown();
    handle.join().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn forwards_combined_output_of_real_process() {
    let (sink, mut lines) = mpsc::unbounded_channel::<String>();
    let mut handle = ProcessSupervisor::spawn(
        ProcessLauncher,
        ClientCommand::new("sh", ["-c", "echo connected; echo 'handshake failed' 1>&2; exit 3"]),
        sink,
        SupervisorConfig {
            restart_delay: Duration::from_millis(20),
        },
    );

    let outcomes = completed(&mut handle, 1).await;
    assert_eq!(outcomes, vec![IterationOutcome::Exited { code: Some(3) }]);

    let mut received = Vec::new();
    while let Ok(line) = lines.try_recv() {
        received.push(line);
    }
    assert!(received.contains(&"connected".to_string()));
    assert!(received.contains(&"handshake failed".to_string()));

    handle.shutdown();
    handle.join().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn invalid_utf8_output_keeps_client_running() {
    let (sink, mut lines) = mpsc::unbounded_channel::<String>();
    let mut handle = ProcessSupervisor::spawn(
        ProcessLauncher,
        ClientCommand::new("sh", ["-c", "printf 'hello\\377\\n'; sleep 0.3; echo still-alive"]),
        sink,
        SupervisorConfig {
            restart_delay: Duration::from_millis(20),
        },
    );

    let outcomes = completed(&mut handle, 1).await;
    assert_eq!(outcomes, vec![IterationOutcome::Exited { code: Some(0) }]);

    assert_eq!(lines.try_recv().unwrap(), "hello\u{FFFD}");
    assert_eq!(lines.try_recv().unwrap(), "still-alive");

    handle.shutdown();
    handle.join().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn shutdown_kills_running_process() {
    let (sink, _lines) = mpsc::unbounded_channel::<String>();
    let mut handle = ProcessSupervisor::spawn(
        ProcessLauncher,
        ClientCommand::new("sleep", ["30"]),
        sink,
        SupervisorConfig::default(),
    );

    assert_eq!(handle.next_event().await, Some(SupervisorEvent::Started { iteration: 1 }));
    handle.shutdown();

    let stopped = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = handle.next_event().await {
            if event == SupervisorEvent::Stopped {
                return true;
            }
        }
        false
    })
    .await
    .unwrap();
    assert!(stopped);
    handle.join().await.unwrap();
}
