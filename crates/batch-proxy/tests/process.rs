//! `ProcessHost` against scripted shell hosts that answer late.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::Duration;

use batch_proxy::{Host, HostError, ProcessHost, ProcessHostConfig, SessionId, TransportError};
use pretty_assertions::assert_eq;

fn shell_host(script: &str, timeout: Duration) -> ProcessHost {
    ProcessHost::start(ProcessHostConfig {
        program: PathBuf::from("sh"),
        args: vec!["-c".to_string(), script.to_string()],
        timeout,
    })
    .expect("spawn sh")
}

#[tokio::test]
async fn test_late_reply_is_skipped_after_timeout() {
    let script = r#"
        read l
        sleep 1
        echo '{"id":1,"status":"ok","data":{"host":"Excel","version":"16.0"}}'
        read l
        echo '{"id":2,"status":"ok","data":{"session":7}}'
        read l
    "#;
    let mut host = shell_host(script, Duration::from_millis(700));

    let err = host.handshake().await.unwrap_err();
    assert!(matches!(
        err,
        HostError::Transport(TransportError::Timeout(d)) if d == Duration::from_millis(700)
    ));

    // The handshake reply arrives first and is dropped.
    assert_eq!(host.open_session().await.unwrap(), SessionId(7));
}

#[tokio::test]
async fn test_reply_split_by_timeout_is_reassembled() {
    let script = r#"
        read l
        printf '{"id":1,'
        sleep 1
        printf '"status":"ok","data":{"session":3}}\n'
        read l
        echo '{"id":2,"status":"ok","data":{"session":4}}'
        read l
    "#;
    let mut host = shell_host(script, Duration::from_millis(600));

    let err = host.open_session().await.unwrap_err();
    assert!(matches!(err, HostError::Transport(TransportError::Timeout(_))));

    assert_eq!(host.open_session().await.unwrap(), SessionId(4));
}

#[tokio::test]
async fn test_reply_from_the_future_is_a_mismatch() {
    let script = r#"
        read l
        echo '{"id":5,"status":"ok","data":{"session":1}}'
        read l
    "#;
    let mut host = shell_host(script, Duration::from_secs(5));

    let err = host.open_session().await.unwrap_err();
    assert!(matches!(
        err,
        HostError::Transport(TransportError::IdMismatch { expected: 1, got: 5 })
    ));
}

#[tokio::test]
async fn test_closed_stdout_is_a_disconnect() {
    let mut host = shell_host("read l", Duration::from_secs(5));
    let err = host.handshake().await.unwrap_err();
    assert!(matches!(err, HostError::Transport(TransportError::Disconnected)));
}
