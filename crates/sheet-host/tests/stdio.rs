//! Drive the `sheet-host` binary over stdio through `ProcessHost`.

use std::path::PathBuf;
use std::time::Duration;

use batch_proxy::{
    open_session, ErrorPolicy, Host, HostType, ProcessHost, ProcessHostConfig, RemoteErrorKind,
    Segment, SessionOptions, Value,
};
use pretty_assertions::assert_eq;

fn start_host() -> ProcessHost {
    ProcessHost::start(ProcessHostConfig {
        program: PathBuf::from(env!("CARGO_BIN_EXE_sheet-host")),
        args: Vec::new(),
        timeout: Duration::from_secs(10),
    })
    .expect("spawn sheet-host")
}

#[tokio::test]
async fn test_handshake_reports_excel() {
    let mut host = start_host();
    let info = host.handshake().await.expect("handshake");
    assert_eq!(info.host, HostType::Excel);
    assert!(!info.version.is_empty());
    host.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_session_over_stdio() {
    let mut host = start_host();

    let values = open_session(&mut host, &SessionOptions::default(), |ctx| {
        Box::pin(async move {
            let sheets = ctx.navigate(&ctx.workbook(), "worksheets");
            let sheet = ctx.navigate(&sheets, Segment::call("getActiveWorksheet", vec![]));
            let tables = ctx.navigate(&sheet, "tables");
            let table = ctx.invoke(&tables, "add", vec!["B2:C2".into(), true.into()]);
            ctx.set(&table, "name", "Scores");
            let rows = ctx.navigate(&table, "rows");
            ctx.invoke(
                &rows,
                "add",
                vec![Value::Null, Value::matrix([["Ada", "9"], ["Brian", "7"]])],
            );
            let body = ctx.navigate(&table, Segment::call("getDataBodyRange", vec![]));
            ctx.load(&body, &["address", "values"]);
            ctx.sync().await?;
            assert_eq!(ctx.round_trips(), 1);
            Ok((
                ctx.get_str(&body, "address")?.to_string(),
                ctx.get(&body, "values")?.clone(),
            ))
        })
    })
    .await
    .expect("session")
    .expect("session succeeded");

    assert_eq!(values.0, "Sheet1!B3:C4");
    assert_eq!(
        values.1,
        Value::List(vec![
            Value::List(vec!["Ada".into(), 9.0.into()]),
            Value::List(vec!["Brian".into(), 7.0.into()]),
        ])
    );
    host.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn test_remote_rejection_over_stdio() {
    let mut host = start_host();
    let options = SessionOptions::default().with_policy(ErrorPolicy::Propagate);

    let err = open_session(&mut host, &options, |ctx| {
        Box::pin(async move {
            let sheets = ctx.navigate(&ctx.workbook(), "worksheets");
            let missing = ctx.navigate(&sheets, Segment::call("getItem", vec!["Nowhere".into()]));
            ctx.load(&missing, &["name"]);
            ctx.sync().await?;
            Ok(())
        })
    })
    .await
    .unwrap_err();

    let remote = err.as_remote().expect("remote rejection");
    assert_eq!(remote.kind(), RemoteErrorKind::InvalidReference);
    assert_eq!(remote.op().map(|op| op.0), Some(0));

    // The host keeps serving after a rejected batch.
    let info = host.handshake().await.expect("handshake after rejection");
    assert_eq!(info.host, HostType::Excel);
    host.shutdown().await.expect("shutdown");
}
