//! The add-in's actions against an in-process spreadsheet host.

use batch_proxy::{
    open_session, ErrorPolicy, Host, HostFuture, HostInfo, HostType, LoadResult, Operation,
    RemoteErrorKind, SessionError, SessionId, SessionOptions, Value,
};
use pretty_assertions::assert_eq;
use sheet_addin::actions::{self, EXPENSES, TABLE_NAME};
use sheet_addin::proxies::Workbook;
use sheet_addin::{Action, AddIn, AddInError, NotificationKind};
use sheet_host::model::display_text;
use sheet_host::{CellAddress, MemoryHost};

async fn ready_addin() -> AddIn<MemoryHost> {
    let mut addin = AddIn::new(MemoryHost::new());
    addin.initialize().await.expect("initialize");
    addin
}

async fn with_table() -> AddIn<MemoryHost> {
    let mut addin = ready_addin().await;
    assert!(addin.run(Action::CreateTable).await.unwrap());
    addin
}

#[tokio::test]
async fn test_actions_wait_for_readiness() {
    let mut addin = AddIn::new(MemoryHost::new());
    let err = addin.run(Action::CreateTable).await.unwrap_err();
    assert!(matches!(err, AddInError::NotReady(_)));
    assert!(!addin.click(Action::CreateTable).await);
    assert!(matches!(
        addin.execute_command("toggleProtection").await,
        Err(AddInError::NotReady(_))
    ));
    assert_eq!(addin.host().batches(), 0);

    addin.initialize().await.unwrap();
    assert!(addin.is_ready());
    assert!(addin.click(Action::CreateTable).await);
}

/// Reports itself as a word processor.
struct WordHost;

impl Host for WordHost {
    fn handshake(&mut self) -> HostFuture<'_, HostInfo> {
        Box::pin(async {
            Ok(HostInfo {
                host: HostType::Word,
                version: "16.0".into(),
            })
        })
    }

    fn open_session(&mut self) -> HostFuture<'_, SessionId> {
        Box::pin(async { Ok(SessionId(1)) })
    }

    fn execute(&mut self, _session: SessionId, _ops: Vec<Operation>) -> HostFuture<'_, Vec<LoadResult>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn release_session(&mut self, _session: SessionId) -> HostFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

#[tokio::test]
async fn test_non_spreadsheet_host_stays_uninitialized() {
    let mut addin = AddIn::new(WordHost);
    let err = addin.initialize().await.unwrap_err();
    assert!(matches!(err, AddInError::UnsupportedHost(HostType::Word)));
    assert!(!addin.is_ready());
}

#[tokio::test]
async fn test_create_table_is_one_round_trip() {
    let addin = with_table().await;
    let host = addin.host();
    assert_eq!(host.batches(), 1);

    let ws = host.workbook().active_sheet();
    let table = &ws.tables[0];
    assert_eq!(table.name, TABLE_NAME);
    assert_eq!(table.columns, vec!["Date", "Merchant", "Category", "Amount"]);
    assert_eq!(table.rows.len(), EXPENSES.len());
    assert_eq!(table.rows[0][3], Value::Number(120.0));
    assert_eq!(table.rows[1][0], Value::from("1/2/2017"));

    assert_eq!(ws.number_formats.len(), 8);
    assert_eq!(
        ws.number_formats.get(&CellAddress::parse("D8").unwrap()).map(String::as_str),
        Some("$#,##0.00")
    );
    assert_eq!(ws.autofit_columns.len(), 4);
    assert_eq!(ws.autofit_rows.len(), 8);
}

#[tokio::test]
async fn test_filter_keeps_education_and_groceries() {
    let mut addin = with_table().await;
    assert!(addin.run(Action::FilterTable).await.unwrap());

    let host = addin.host();
    // One round trip for the filter load, one for applying it.
    assert_eq!(host.batches(), 3);
    let table = &host.workbook().active_sheet().tables[0];
    assert_eq!(table.visible_row_count(), 3);
    let visible: Vec<String> = (0..table.rows.len())
        .filter(|&r| table.row_visible(r))
        .map(|r| display_text(&table.rows[r][2]))
        .collect();
    assert_eq!(visible, vec!["Groceries", "Education", "Groceries"]);
}

#[tokio::test]
async fn test_sort_by_merchant_descending() {
    let mut addin = with_table().await;
    assert!(addin.run(Action::SortTable).await.unwrap());

    let table = &addin.host().workbook().active_sheet().tables[0];
    let merchants: Vec<String> = table.rows.iter().map(|r| display_text(&r[1])).collect();
    assert_eq!(
        merchants,
        vec![
            "Trey Research",
            "The Phone Company",
            "Northwind Electric Cars",
            "Coho Vineyard",
            "Best For You Organics Company",
            "Best For You Organics Company",
            "Bellows College",
        ]
    );
    // Equal merchants keep their original order.
    assert_eq!(table.rows[4][3], Value::Number(27.9));
    assert_eq!(table.rows[5][3], Value::Number(97.88));
}

#[tokio::test]
async fn test_create_chart_settings() {
    let mut addin = with_table().await;
    assert!(addin.run(Action::CreateChart).await.unwrap());

    let ws = addin.host().workbook().active_sheet();
    assert_eq!(ws.charts.len(), 1);
    let chart = &ws.charts[0];
    assert_eq!(chart.chart_type, "ColumnClustered");
    assert_eq!(chart.source.to_string(), "A2:D8");
    assert_eq!(chart.top_left.as_deref(), Some("A15"));
    assert_eq!(chart.bottom_right.as_deref(), Some("F30"));
    assert_eq!(chart.title.as_deref(), Some("Expenses"));
    assert_eq!(chart.legend_position, "Right");
    assert_eq!(chart.legend_fill.as_deref(), Some("white"));
    assert_eq!(chart.data_label_font_size, 15.0);
    assert_eq!(chart.data_label_font_color, "black");
    assert_eq!(chart.series.len(), 1);
    assert_eq!(chart.series[0].name, "Value in $");
}

#[tokio::test]
async fn test_freeze_header() {
    let mut addin = ready_addin().await;
    assert!(addin.run(Action::FreezeHeader).await.unwrap());
    assert_eq!(addin.host().workbook().active_sheet().frozen_rows, 1);
}

#[tokio::test]
async fn test_toggle_protection_round_trips() {
    let mut addin = ready_addin().await;

    assert!(addin.run(Action::ToggleProtection).await.unwrap());
    assert!(addin.host().workbook().active_sheet().protected);
    assert_eq!(addin.host().batches(), 2);

    // Protected sheets refuse content changes; the failure is swallowed.
    assert!(!addin.run(Action::FreezeHeader).await.unwrap());
    assert_eq!(addin.host().workbook().active_sheet().frozen_rows, 0);

    assert!(addin.run(Action::ToggleProtection).await.unwrap());
    assert!(!addin.host().workbook().active_sheet().protected);
}

#[tokio::test]
async fn test_missing_table_is_swallowed_or_propagated() {
    let mut addin = ready_addin().await;
    assert!(!addin.run(Action::SortTable).await.unwrap());

    let mut addin = addin.with_policy(ErrorPolicy::Propagate);
    let err = addin.run(Action::SortTable).await.unwrap_err();
    match err {
        AddInError::Session(e) => {
            let remote = e.as_remote().expect("remote rejection");
            assert_eq!(remote.kind(), RemoteErrorKind::InvalidReference);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_filter_is_unreachable_before_its_load_syncs() {
    let mut addin = with_table().await;
    let options = SessionOptions::default().with_policy(ErrorPolicy::Propagate);

    let err = open_session(addin.host_mut(), &options, |ctx| {
        Box::pin(async move {
            let sheet = Workbook::new(ctx).active_worksheet(ctx);
            let table = sheet.tables(ctx).get_item(ctx, TABLE_NAME);
            let column = table.columns(ctx).get_item(ctx, "Category");
            let pending = column.load_filter(ctx);
            let filter = pending.resolve(ctx)?;
            filter.apply_values_filter(ctx, &["Other"]);
            ctx.sync().await?;
            Ok(())
        })
    })
    .await
    .unwrap_err();

    assert!(err.is_not_loaded());
    assert_eq!(addin.host().workbook().active_sheet().tables[0].visible_row_count(), 7);
}

#[tokio::test]
async fn test_filter_criteria_after_sync() {
    let mut addin = with_table().await;
    assert!(addin.run(Action::FilterTable).await.unwrap());

    let criteria = open_session(addin.host_mut(), &SessionOptions::default(), |ctx| {
        Box::pin(async move {
            let sheet = Workbook::new(ctx).active_worksheet(ctx);
            let table = sheet.tables(ctx).get_item(ctx, TABLE_NAME);
            let column = table.columns(ctx).get_item(ctx, "Category");
            let pending = column.load_filter(ctx);
            ctx.sync().await?;
            Ok(pending.criteria(ctx)?.clone())
        })
    })
    .await
    .unwrap()
    .unwrap();

    let criteria = criteria.as_object().unwrap();
    assert_eq!(criteria["filterOn"], Value::from("Values"));
    assert_eq!(
        criteria["values"],
        Value::List(vec!["Education".into(), "Groceries".into()])
    );
}

#[tokio::test]
async fn test_toggle_protection_reports_new_state() {
    let mut host = MemoryHost::new();
    let options = SessionOptions::default();
    let first = open_session(&mut host, &options, |ctx| Box::pin(actions::toggle_protection(ctx)))
        .await
        .unwrap();
    let second = open_session(&mut host, &options, |ctx| Box::pin(actions::toggle_protection(ctx)))
        .await
        .unwrap();
    assert_eq!((first, second), (Some(true), Some(false)));
}

#[tokio::test]
async fn test_commands() {
    let mut addin = ready_addin().await;

    addin.execute_command("toggleProtection").await.unwrap();
    assert!(addin.host().workbook().active_sheet().protected);

    addin.execute_command("action").await.unwrap();
    let note = addin.notifications().get("action").unwrap();
    assert_eq!(note.kind, NotificationKind::Informational);
    assert_eq!(note.message, "Performed action.");
    assert_eq!(note.icon.as_deref(), Some("Icon.80x80"));

    assert!(matches!(
        addin.execute_command("nope").await,
        Err(AddInError::UnknownCommand(_))
    ));
}

#[tokio::test]
async fn test_commands_follow_the_addin_policy() {
    let mut addin = ready_addin().await.with_policy(ErrorPolicy::Propagate);
    addin.commands_mut().associate("strict", |_host, event| {
        Box::pin(async move {
            if event.policy() == ErrorPolicy::Propagate {
                event.failed(SessionError::action("strict mode"));
            } else {
                event.completed();
            }
        })
    });

    let err = addin.execute_command("strict").await.unwrap_err();
    assert!(matches!(err, AddInError::Session(SessionError::Action(_))));

    // Protecting succeeds either way.
    addin.execute_command("toggleProtection").await.unwrap();
    assert!(addin.host().workbook().active_sheet().protected);
}

#[tokio::test]
async fn test_walkthrough() {
    let mut addin = ready_addin().await;
    for action in Action::ALL {
        assert!(addin.run(action).await.unwrap(), "{action} failed");
    }
    let ws = addin.host().workbook().active_sheet();
    assert!(ws.protected);
    assert_eq!(ws.charts.len(), 1);
    assert_eq!(ws.frozen_rows, 1);
    assert_eq!(addin.host().open_sessions(), 0);
}

#[tokio::test]
async fn test_custom_body_error_is_an_action_error() {
    let mut host = MemoryHost::new();
    let options = SessionOptions::default().with_policy(ErrorPolicy::Propagate);
    let err = open_session(&mut host, &options, |_ctx| {
        Box::pin(async move { Err::<(), _>(SessionError::action("no expenses to import")) })
    })
    .await
    .unwrap_err();
    assert!(matches!(err, SessionError::Action(_)));
    assert_eq!(host.batches(), 0);
}
