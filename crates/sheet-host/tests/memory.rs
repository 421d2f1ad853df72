//! Sessions against an in-process `MemoryHost`.

use batch_proxy::{open_session, ErrorPolicy, RemoteErrorKind, Segment, SessionOptions, SharedHost, Value};
use pretty_assertions::assert_eq;
use sheet_host::{CellAddress, MemoryHost};

#[tokio::test]
async fn test_protected_read_is_idempotent() {
    let mut host = MemoryHost::new();
    host.workbook_mut().worksheets[0].protected = true;

    let reads = open_session(&mut host, &SessionOptions::default(), |ctx| {
        Box::pin(async move {
            let sheets = ctx.navigate(&ctx.workbook(), "worksheets");
            let sheet = ctx.navigate(&sheets, Segment::call("getActiveWorksheet", vec![]));
            ctx.load(&sheet, &["protection/protected"]);
            ctx.sync().await?;
            let first = ctx.get_bool(&sheet, "protection/protected")?;
            let second = ctx.get_bool(&sheet, "protection/protected")?;
            Ok((first, second, ctx.round_trips()))
        })
    })
    .await
    .unwrap();

    assert_eq!(reads, Some((true, true, 1)));
}

#[tokio::test]
async fn test_rejected_batch_leaves_document_untouched() {
    let mut host = MemoryHost::new();
    let options = SessionOptions::default().with_policy(ErrorPolicy::Propagate);

    let err = open_session(&mut host, &options, |ctx| {
        Box::pin(async move {
            let sheets = ctx.navigate(&ctx.workbook(), "worksheets");
            let sheet = ctx.navigate(&sheets, Segment::call("getActiveWorksheet", vec![]));
            let a1 = ctx.navigate(&sheet, Segment::call("getRange", vec!["A1".into()]));
            ctx.set(&a1, "values", Value::matrix([["kept?"]]));
            let legend = ctx.navigate(&sheet, "legend");
            ctx.set(&legend, "position", "Right");
            ctx.sync().await?;
            Ok(())
        })
    })
    .await
    .unwrap_err();

    let remote = err.as_remote().expect("remote rejection");
    assert_eq!(remote.kind(), RemoteErrorKind::UnknownMember);
    assert!(host.workbook().worksheets[0].cells.is_empty());
    assert_eq!(host.open_sessions(), 0);
}

#[tokio::test]
async fn test_sessions_share_one_document() {
    let host = SharedHost::new(MemoryHost::new());

    let mut writer = host.clone();
    open_session(&mut writer, &SessionOptions::labeled("writer"), |ctx| {
        Box::pin(async move {
            let sheets = ctx.navigate(&ctx.workbook(), "worksheets");
            let sheet = ctx.navigate(&sheets, Segment::call("getActiveWorksheet", vec![]));
            let cell = ctx.navigate(&sheet, Segment::call("getRange", vec!["C3".into()]));
            ctx.set(&cell, "values", Value::matrix([[42]]));
            ctx.sync().await?;
            Ok(())
        })
    })
    .await
    .unwrap();

    let mut reader = host.clone();
    let seen = open_session(&mut reader, &SessionOptions::labeled("reader"), |ctx| {
        Box::pin(async move {
            let sheets = ctx.navigate(&ctx.workbook(), "worksheets");
            let sheet = ctx.navigate(&sheets, Segment::call("getItem", vec!["sheet1".into()]));
            let cell = ctx.navigate(&sheet, Segment::call("getRange", vec!["C3".into()]));
            ctx.load(&cell, &["values"]);
            ctx.sync().await?;
            Ok(ctx.get(&cell, "values")?.clone())
        })
    })
    .await
    .unwrap();

    assert_eq!(seen, Some(Value::matrix([[42.0]])));
    let stored = host
        .with(|h| h.workbook().worksheets[0].cell(CellAddress::parse("C3").unwrap()))
        .await;
    assert_eq!(stored, Value::Number(42.0));
}
