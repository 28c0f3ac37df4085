//! Log tail worker
//!
//! Spawns the follow process on the monitored file and consumes its output
//! line by line. Stdout lines go through the pattern set; stderr lines are
//! only logged.

use super::{Shared, Worker};
use crate::error::{Result, ScannerError};
use crate::events;
use crate::store::is_address;
use log::{debug, info, warn};
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

type LineResult = io::Result<String>;

pub(crate) async fn run(shared: Arc<Shared>, started: oneshot::Sender<()>) -> Result<()> {
    let stop = shared.coordinator.stop_token(Worker::Tail);
    let settings = &shared.settings;
    let program = settings.follow.program.clone();
    info!("scanner: started monitoring log file: {}", settings.log_file.display());

    let mut child = Command::new(&program)
        .args(&settings.follow.args)
        .arg(&settings.log_file)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ScannerError::TailSpawn {
            program: program.clone(),
            source,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| ScannerError::TailRead {
        stream: "stdout",
        source: io::Error::new(io::ErrorKind::BrokenPipe, "stdout not captured"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ScannerError::TailRead {
        stream: "stderr",
        source: io::Error::new(io::ErrorKind::BrokenPipe, "stderr not captured"),
    })?;

    let (stdout_tx, mut stdout_rx) = mpsc::channel::<LineResult>(1);
    let (stderr_tx, mut stderr_rx) = mpsc::channel::<LineResult>(1);
    shared.tasks.spawn(read_lines("stdout", stdout, stdout_tx));
    shared.tasks.spawn(read_lines("stderr", stderr, stderr_tx));

    shared.coordinator.attach_tail(child).await;
    let _ = started.send(());

    let mut stdout_open = true;
    let mut stderr_open = true;
    while stdout_open || stderr_open {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                info!("scanner: stop requested");
                return Ok(());
            }
            line = stdout_rx.recv(), if stdout_open => match line {
                Some(Ok(line)) => handle_line(&shared, line.trim()).await?,
                Some(Err(source)) => return Err(ScannerError::TailRead { stream: "stdout", source }),
                None => {
                    debug!("scanner: stdout tailpipe has closed");
                    stdout_open = false;
                }
            },
            line = stderr_rx.recv(), if stderr_open => match line {
                Some(Ok(line)) => warn!("scanner: tail: {}", line.trim()),
                Some(Err(source)) => return Err(ScannerError::TailRead { stream: "stderr", source }),
                None => {
                    debug!("scanner: stderr tailpipe has closed");
                    stderr_open = false;
                }
            },
        }
    }

    // Both pipes closed without a stop request: the follow process ended
    // on its own, unless teardown already took and killed it.
    let Some(mut child) = shared.coordinator.detach_tail().await else {
        return Ok(());
    };
    let status = child
        .wait()
        .await
        .map_err(|source| ScannerError::TailRead { stream: "status", source })?;
    if !status.success() {
        return Err(ScannerError::TailExited { program, status });
    }
    info!("scanner: follow process exited: {}", status);
    Ok(())
}

/// Apply every pattern to one line and record each matched address
///
/// Per address: refresh its timeout record, run the add hook, then append it
/// to the watchlist. A failed step leaves earlier steps in place.
pub(crate) async fn handle_line(shared: &Shared, line: &str) -> Result<()> {
    for addr in shared.patterns.extract(line) {
        if !is_address(addr) {
            warn!("scanner: ignoring non-address match '{}' in: {}", addr, line);
            continue;
        }
        let expires_at = shared.timeouts.refresh(addr)?;
        if let Some(hook) = &shared.add_hook {
            hook.invoke(addr).await?;
        }
        let outcome = shared.watchlist.add(addr)?;
        events::address_matched(addr, outcome, expires_at, shared.watchlist.path());
    }
    Ok(())
}

/// Forward newline-delimited output to the worker; invalid UTF-8 is replaced
async fn read_lines<R>(stream: &'static str, reader: R, tx: mpsc::Sender<LineResult>)
where
    R: AsyncRead + Unpin,
{
    debug!("scanner: tail {} reader started", stream);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(Ok(line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("scanner: tailpipe {}: {}", stream, e);
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
    }
    debug!("scanner: tail {} reader exiting", stream);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hook::CommandLine;
    use crate::scanner::test_support::{settings, shared};
    use crate::scanner::Scanner;
    use chrono::Utc;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_handle_line_records_address() {
        let dir = tempdir().unwrap();
        let scanner = Scanner::new(settings(dir.path())).unwrap();
        let shared = shared(&scanner);

        let before = Utc::now();
        handle_line(&shared, "connection from 10.0.0.5 accepted").await.unwrap();

        assert_eq!(scanner.watchlist().read().unwrap(), vec!["10.0.0.5"]);
        let record = scanner.timeouts().read("10.0.0.5").unwrap();
        let expected = before + chrono::Duration::seconds(60);
        assert!(record.expires_at >= expected);
        assert!(record.expires_at < expected + chrono::Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_rematch_refreshes_without_duplicating() {
        let dir = tempdir().unwrap();
        let scanner = Scanner::new(settings(dir.path())).unwrap();
        let shared = shared(&scanner);

        handle_line(&shared, "from 10.0.0.5").await.unwrap();
        let first = scanner.timeouts().read("10.0.0.5").unwrap().expires_at;
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle_line(&shared, "again from 10.0.0.5").await.unwrap();
        let second = scanner.timeouts().read("10.0.0.5").unwrap().expires_at;

        assert!(second > first);
        assert_eq!(
            fs::read_to_string(scanner.watchlist().path()).unwrap(),
            "10.0.0.5\n"
        );
    }

    #[tokio::test]
    async fn test_non_address_capture_is_skipped() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.patterns = vec![r"user (\S+) from (\S+)".to_string()];
        let scanner = Scanner::new(settings).unwrap();

        handle_line(&shared(&scanner), "user root from 10.0.0.5").await.unwrap();
        assert!(scanner.watchlist().read().unwrap().is_empty());
        assert!(!scanner.timeouts().dir().join("root").exists());
    }

    #[tokio::test]
    async fn test_add_hook_failure_keeps_refreshed_record() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.add_command = Some(CommandLine::new("false", Vec::<String>::new()));
        let scanner = Scanner::new(settings).unwrap();

        let err = handle_line(&shared(&scanner), "from 10.0.0.5").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Hook);
        assert!(scanner.timeouts().exists("10.0.0.5"));
        assert!(scanner.watchlist().read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_processes_output_until_follow_exits() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.follow = CommandLine::new("cat", Vec::<String>::new());
        fs::write(
            &settings.log_file,
            b"accepted 10.0.0.1\n\xff\xfe garbage\naccepted 10.0.0.2\n",
        )
        .unwrap();
        let scanner = Scanner::new(settings).unwrap();

        let (tx, _rx) = oneshot::channel();
        run(shared(&scanner), tx).await.unwrap();

        assert_eq!(
            scanner.watchlist().read().unwrap(),
            vec!["10.0.0.1", "10.0.0.2"]
        );
    }

    #[tokio::test]
    async fn test_run_reports_abnormal_follow_exit() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.follow = CommandLine::new("sh", ["-c", "echo cannot follow >&2; exit 2", "sh"]);
        let scanner = Scanner::new(settings).unwrap();

        let (tx, _rx) = oneshot::channel();
        let err = run(shared(&scanner), tx).await.unwrap_err();
        match err {
            ScannerError::TailExited { status, .. } => assert_eq!(status.code(), Some(2)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_reports_spawn_failure() {
        let dir = tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.follow = CommandLine::new("/nonexistent/follow", Vec::<String>::new());
        let scanner = Scanner::new(settings).unwrap();

        let (tx, rx) = oneshot::channel();
        let err = run(shared(&scanner), tx).await.unwrap_err();
        assert!(matches!(err, ScannerError::TailSpawn { .. }));
        // setup never completed
        assert!(rx.await.is_err());
    }
}
