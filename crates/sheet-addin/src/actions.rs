//! The add-in's actions, each one unit of work inside a batch session.
//!
//! Every function here queues its work on the given context and syncs
//! explicitly. None of them catch errors; the session boundary does.

use batch_proxy::{RequestContext, SessionError, Value};

use crate::proxies::{ChartType, LegendPosition, SeriesBy, SortField, Workbook};

pub const TABLE_NAME: &str = "ExpensesTable";
pub const TABLE_ADDRESS: &str = "A1:D1";
pub const HEADERS: [&str; 4] = ["Date", "Merchant", "Category", "Amount"];

pub const EXPENSES: [[&str; 4]; 7] = [
    ["1/1/2017", "The Phone Company", "Communications", "120"],
    ["1/2/2017", "Northwind Electric Cars", "Transportation", "142.33"],
    ["1/5/2017", "Best For You Organics Company", "Groceries", "27.9"],
    ["1/10/2017", "Coho Vineyard", "Restaurant", "33"],
    ["1/11/2017", "Bellows College", "Education", "350.1"],
    ["1/15/2017", "Trey Research", "Other", "135"],
    ["1/15/2017", "Best For You Organics Company", "Groceries", "97.88"],
];

pub const AMOUNT_COLUMN: u32 = 3;
pub const AMOUNT_FORMAT: &str = "$#,##0.00";

pub const FILTER_COLUMN: &str = "Category";
pub const FILTER_VALUES: [&str; 2] = ["Education", "Groceries"];

/// Merchant, descending.
pub const SORT_FIELDS: [SortField; 1] = [SortField {
    key: 1,
    ascending: false,
}];

pub const CHART_TYPE: ChartType = ChartType::ColumnClustered;
pub const CHART_TOP_LEFT: &str = "A15";
pub const CHART_BOTTOM_RIGHT: &str = "F30";
pub const CHART_TITLE: &str = "Expenses";
pub const LEGEND_FILL: &str = "white";
pub const DATA_LABEL_SIZE: f64 = 15.0;
pub const DATA_LABEL_COLOR: &str = "black";
pub const SERIES_NAME: &str = "Value in $";

/// Create and format the expenses table on the active worksheet. One
/// round trip.
pub async fn create_table(ctx: &mut RequestContext<'_>) -> Result<(), SessionError> {
    let sheet = Workbook::new(ctx).active_worksheet(ctx);
    let table = sheet.tables(ctx).add(ctx, TABLE_ADDRESS, true);
    table.set_name(ctx, TABLE_NAME);

    table.header_row_range(ctx).set_values(ctx, Value::matrix([HEADERS]));
    table.rows(ctx).add(ctx, None, Value::matrix(EXPENSES));

    let amount = table.columns(ctx).get_item_at(ctx, AMOUNT_COLUMN).get_range(ctx);
    amount.set_number_format(ctx, Value::matrix([[AMOUNT_FORMAT]]));
    let format = table.range(ctx).format(ctx);
    format.autofit_columns(ctx);
    format.autofit_rows(ctx);

    ctx.sync().await?;
    Ok(())
}

/// Keep only the Education and Groceries rows visible. The filter is
/// loaded and synced before it is used.
pub async fn filter_table(ctx: &mut RequestContext<'_>) -> Result<(), SessionError> {
    let sheet = Workbook::new(ctx).active_worksheet(ctx);
    let table = sheet.tables(ctx).get_item(ctx, TABLE_NAME);
    let category = table.columns(ctx).get_item(ctx, FILTER_COLUMN);

    let pending = category.load_filter(ctx);
    ctx.sync().await?;

    let filter = pending.resolve(ctx)?;
    filter.apply_values_filter(ctx, &FILTER_VALUES);
    ctx.sync().await?;
    Ok(())
}

/// Sort the table by merchant name, descending.
pub async fn sort_table(ctx: &mut RequestContext<'_>) -> Result<(), SessionError> {
    let sheet = Workbook::new(ctx).active_worksheet(ctx);
    let table = sheet.tables(ctx).get_item(ctx, TABLE_NAME);
    table.sort(ctx).apply(ctx, &SORT_FIELDS);

    ctx.sync().await?;
    Ok(())
}

/// Chart the table's data body.
pub async fn create_chart(ctx: &mut RequestContext<'_>) -> Result<(), SessionError> {
    let sheet = Workbook::new(ctx).active_worksheet(ctx);
    let table = sheet.tables(ctx).get_item(ctx, TABLE_NAME);
    let data = table.data_body_range(ctx);

    let chart = sheet.charts(ctx).add(ctx, CHART_TYPE, &data, SeriesBy::Auto);
    chart.set_position(ctx, CHART_TOP_LEFT, Some(CHART_BOTTOM_RIGHT));
    chart.title(ctx).set_text(ctx, CHART_TITLE);

    let legend = chart.legend(ctx);
    legend.set_position(ctx, LegendPosition::Right);
    legend.fill(ctx).set_solid_color(ctx, LEGEND_FILL);

    let font = chart.data_labels(ctx).font(ctx);
    font.set_size(ctx, DATA_LABEL_SIZE);
    font.set_color(ctx, DATA_LABEL_COLOR);

    // The only numeric column becomes the only series.
    chart.series(ctx).get_item_at(ctx, 0).set_name(ctx, SERIES_NAME);

    ctx.sync().await?;
    Ok(())
}

/// Keep the header row in view.
pub async fn freeze_header(ctx: &mut RequestContext<'_>) -> Result<(), SessionError> {
    let sheet = Workbook::new(ctx).active_worksheet(ctx);
    sheet.freeze_panes(ctx).freeze_rows(ctx, 1);

    ctx.sync().await?;
    Ok(())
}

/// Flip the active worksheet's protection. Returns the new state.
///
/// The current state is a remote value, so it is loaded and synced before
/// the branch that depends on it.
pub async fn toggle_protection(ctx: &mut RequestContext<'_>) -> Result<bool, SessionError> {
    let sheet = Workbook::new(ctx).active_worksheet(ctx);
    sheet.load_protected(ctx);
    ctx.sync().await?;

    let protection = sheet.protection(ctx);
    let protect = !sheet.protected(ctx)?;
    if protect {
        protection.protect(ctx);
    } else {
        protection.unprotect(ctx);
    }

    ctx.sync().await?;
    Ok(protect)
}
