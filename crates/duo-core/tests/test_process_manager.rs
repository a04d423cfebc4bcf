#![cfg(unix)]

use std::time::Duration;

use duo_core::{CommandSpec, Error, ProcessManager, UnixProcessManager};
use futures::StreamExt;

fn fixture(name: &str) -> CommandSpec {
    CommandSpec {
        name: name.to_owned(),
        cmd: vec!["bash".to_owned(), format!("./{name}.sh")],
        cwd: Some("./tests/fixtures/".parse().unwrap()),
    }
}

async fn collect(stream: duo_core::BoxStream<String>) -> Vec<String> {
    stream.collect().await
}

#[tokio::test]
async fn test_process_manager_stdout() {
    let mut pm = UnixProcessManager::new();

    let out = pm.spawn(fixture("stdout")).await.unwrap();

    assert_eq!(
        collect(out.stdout).await,
        vec!["INFO: line 1", "INFO: line 2", "INFO: stdout.sh finished"]
    );
    assert!(collect(out.stderr).await.is_empty());
    assert_eq!(pm.wait(out.id, Duration::from_secs(5)).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_process_manager_stderr() {
    let mut pm = UnixProcessManager::new();

    let out = pm.spawn(fixture("stderr")).await.unwrap();

    assert!(collect(out.stdout).await.is_empty());
    assert_eq!(
        collect(out.stderr).await,
        vec!["ERROR: line 1", "ERROR: line 2", "ERROR: stderr.sh finished"]
    );
}

#[tokio::test]
async fn test_process_manager_line_endings() {
    let mut pm = UnixProcessManager::new();

    let out = pm.spawn(fixture("crlf")).await.unwrap();

    assert_eq!(
        collect(out.stdout).await,
        vec!["Compiled successfully!", "partial line without newline"]
    );
}

#[tokio::test]
async fn test_process_manager_exit_code() {
    let mut pm = UnixProcessManager::new();

    let out = pm.spawn(fixture("exit_code")).await.unwrap();
    assert_eq!(collect(out.stdout).await, vec!["exiting with 3"]);

    assert_eq!(pm.wait(out.id, Duration::from_secs(5)).await.unwrap(), Some(3));
    assert!(matches!(
        pm.wait(out.id, Duration::ZERO).await,
        Err(Error::AlreadyExited(_))
    ));
}

#[tokio::test]
async fn test_process_manager_poll_running() {
    let mut pm = UnixProcessManager::new();

    let out = pm.spawn(fixture("infinite")).await.unwrap();
    assert_eq!(pm.wait(out.id, Duration::ZERO).await.unwrap(), None);

    pm.kill(out.id).await.unwrap();
}

#[tokio::test]
async fn test_process_manager_sigterm() {
    let mut pm = UnixProcessManager::new();

    let out = pm.spawn(fixture("infinite")).await.unwrap();

    pm.shutdown(out.id).await.unwrap();
    let result = pm.wait(out.id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(result, Some(128 + libc::SIGTERM));
}

#[tokio::test]
async fn test_process_manager_sigkill() {
    let mut pm = UnixProcessManager::new();

    let out = pm.spawn(fixture("ignore_sigterm")).await.unwrap();

    pm.shutdown(out.id).await.unwrap();
    let result = pm.wait(out.id, Duration::from_millis(300)).await.unwrap();
    assert_eq!(result, None);

    pm.kill(out.id).await.unwrap();
    let result = match pm.wait(out.id, Duration::from_secs(5)).await {
        Ok(code) => code,
        Err(Error::AlreadyExited(_)) => Some(128 + libc::SIGKILL),
        Err(err) => panic!("unexpected error: {err}"),
    };
    assert_eq!(result, Some(128 + libc::SIGKILL));
}

#[tokio::test]
async fn test_process_manager_missing_executable() {
    let mut pm = UnixProcessManager::new();

    let err = pm
        .spawn(CommandSpec {
            name: "missing".to_owned(),
            cmd: vec!["duo-no-such-binary".to_owned()],
            cwd: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_missing_executable());

    let err = pm
        .spawn(CommandSpec {
            name: "empty".to_owned(),
            cmd: vec![],
            cwd: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyCommand(_)));
}
