//! Typed proxies for the spreadsheet object model.
//!
//! Each type wraps a [`ProxyHandle`] and knows which navigation steps,
//! property names and methods its remote counterpart has. Methods that
//! only navigate or queue work take `&mut RequestContext` and never suspend;
//! readers go through the context's checked property cache and fail with
//! [`ProxyError::NotLoaded`] until a sync has carried the load.

use std::collections::BTreeMap;
use std::fmt;

use batch_proxy::{OpId, ProxyError, ProxyHandle, RequestContext, Segment, Value};

macro_rules! proxy {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(ProxyHandle);

        impl $name {
            /// The untyped handle behind this proxy.
            pub fn handle(&self) -> &ProxyHandle {
                &self.0
            }
        }
    };
}

fn getter(ctx: &mut RequestContext<'_>, parent: &ProxyHandle, method: &str, args: Vec<Value>) -> ProxyHandle {
    ctx.navigate(parent, Segment::call(method, args))
}

proxy!(
    /// The session's workbook.
    Workbook
);
proxy!(WorksheetCollection);
proxy!(Worksheet);
proxy!(TableCollection);
proxy!(Table);
proxy!(TableRowCollection);
proxy!(TableColumnCollection);
proxy!(TableColumn);
proxy!(
    /// The value filter of one table column. Obtained through
    /// [`PendingFilter::resolve`] once the column's filter has been loaded.
    ColumnFilter
);
proxy!(TableSort);
proxy!(Range);
proxy!(RangeFormat);
proxy!(ChartCollection);
proxy!(Chart);
proxy!(ChartTitle);
proxy!(ChartLegend);
proxy!(ChartFill);
proxy!(ChartDataLabels);
proxy!(ChartFont);
proxy!(ChartSeriesCollection);
proxy!(ChartSeries);
proxy!(WorksheetProtection);
proxy!(FreezePanes);

impl Workbook {
    pub fn new(ctx: &RequestContext<'_>) -> Self {
        Self(ctx.workbook())
    }

    pub fn worksheets(&self, ctx: &mut RequestContext<'_>) -> WorksheetCollection {
        WorksheetCollection(ctx.navigate(&self.0, "worksheets"))
    }

    /// Shorthand for `worksheets.getActiveWorksheet()`.
    pub fn active_worksheet(&self, ctx: &mut RequestContext<'_>) -> Worksheet {
        self.worksheets(ctx).get_active_worksheet(ctx)
    }
}

impl WorksheetCollection {
    pub fn get_active_worksheet(&self, ctx: &mut RequestContext<'_>) -> Worksheet {
        Worksheet(getter(ctx, &self.0, "getActiveWorksheet", vec![]))
    }

    pub fn get_item(&self, ctx: &mut RequestContext<'_>, name: &str) -> Worksheet {
        Worksheet(getter(ctx, &self.0, "getItem", vec![name.into()]))
    }

    pub fn get_item_at(&self, ctx: &mut RequestContext<'_>, index: u32) -> Worksheet {
        Worksheet(getter(ctx, &self.0, "getItemAt", vec![index.into()]))
    }

    pub fn add(&self, ctx: &mut RequestContext<'_>, name: Option<&str>) -> Worksheet {
        Worksheet(ctx.invoke(&self.0, "add", vec![name.into()]))
    }
}

impl Worksheet {
    pub const PROTECTED: &'static str = "protection/protected";

    pub fn tables(&self, ctx: &mut RequestContext<'_>) -> TableCollection {
        TableCollection(ctx.navigate(&self.0, "tables"))
    }

    pub fn charts(&self, ctx: &mut RequestContext<'_>) -> ChartCollection {
        ChartCollection(ctx.navigate(&self.0, "charts"))
    }

    pub fn protection(&self, ctx: &mut RequestContext<'_>) -> WorksheetProtection {
        WorksheetProtection(ctx.navigate(&self.0, "protection"))
    }

    pub fn freeze_panes(&self, ctx: &mut RequestContext<'_>) -> FreezePanes {
        FreezePanes(ctx.navigate(&self.0, "freezePanes"))
    }

    pub fn get_range(&self, ctx: &mut RequestContext<'_>, address: &str) -> Range {
        Range(getter(ctx, &self.0, "getRange", vec![address.into()]))
    }

    pub fn activate(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "activate", vec![]);
    }

    /// Queue a load of `name` and `protection/protected`.
    pub fn load(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &["name", Self::PROTECTED])
    }

    /// Queue a load of the protection flag through this worksheet.
    pub fn load_protected(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &[Self::PROTECTED])
    }

    pub fn name<'c>(&self, ctx: &'c RequestContext<'_>) -> Result<&'c str, ProxyError> {
        ctx.get_str(&self.0, "name")
    }

    /// The protection flag, as loaded by [`load_protected`](Self::load_protected).
    pub fn protected(&self, ctx: &RequestContext<'_>) -> Result<bool, ProxyError> {
        ctx.get_bool(&self.0, Self::PROTECTED)
    }
}

impl TableCollection {
    /// Queue creation of a table over `address`.
    pub fn add(&self, ctx: &mut RequestContext<'_>, address: &str, has_headers: bool) -> Table {
        Table(ctx.invoke(&self.0, "add", vec![address.into(), has_headers.into()]))
    }

    pub fn get_item(&self, ctx: &mut RequestContext<'_>, name: &str) -> Table {
        Table(getter(ctx, &self.0, "getItem", vec![name.into()]))
    }

    pub fn get_item_at(&self, ctx: &mut RequestContext<'_>, index: u32) -> Table {
        Table(getter(ctx, &self.0, "getItemAt", vec![index.into()]))
    }

    pub fn load_count(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &["count"])
    }

    pub fn count(&self, ctx: &RequestContext<'_>) -> Result<f64, ProxyError> {
        ctx.get_f64(&self.0, "count")
    }
}

impl Table {
    pub fn set_name(&self, ctx: &mut RequestContext<'_>, name: &str) {
        ctx.set(&self.0, "name", name);
    }

    pub fn header_row_range(&self, ctx: &mut RequestContext<'_>) -> Range {
        Range(getter(ctx, &self.0, "getHeaderRowRange", vec![]))
    }

    pub fn data_body_range(&self, ctx: &mut RequestContext<'_>) -> Range {
        Range(getter(ctx, &self.0, "getDataBodyRange", vec![]))
    }

    pub fn range(&self, ctx: &mut RequestContext<'_>) -> Range {
        Range(getter(ctx, &self.0, "getRange", vec![]))
    }

    pub fn rows(&self, ctx: &mut RequestContext<'_>) -> TableRowCollection {
        TableRowCollection(ctx.navigate(&self.0, "rows"))
    }

    pub fn columns(&self, ctx: &mut RequestContext<'_>) -> TableColumnCollection {
        TableColumnCollection(ctx.navigate(&self.0, "columns"))
    }

    pub fn sort(&self, ctx: &mut RequestContext<'_>) -> TableSort {
        TableSort(ctx.navigate(&self.0, "sort"))
    }

    pub fn load(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &["name", "rowCount", "visibleRowCount"])
    }

    pub fn name<'c>(&self, ctx: &'c RequestContext<'_>) -> Result<&'c str, ProxyError> {
        ctx.get_str(&self.0, "name")
    }

    pub fn row_count(&self, ctx: &RequestContext<'_>) -> Result<usize, ProxyError> {
        ctx.get_f64(&self.0, "rowCount").map(|n| n as usize)
    }

    pub fn visible_row_count(&self, ctx: &RequestContext<'_>) -> Result<usize, ProxyError> {
        ctx.get_f64(&self.0, "visibleRowCount").map(|n| n as usize)
    }
}

impl TableRowCollection {
    /// Queue rows for insertion at `index`, or at the end when `None`.
    pub fn add(&self, ctx: &mut RequestContext<'_>, index: Option<u32>, values: Value) {
        ctx.invoke(&self.0, "add", vec![index.into(), values]);
    }
}

impl TableColumnCollection {
    pub fn get_item(&self, ctx: &mut RequestContext<'_>, name: &str) -> TableColumn {
        TableColumn(getter(ctx, &self.0, "getItem", vec![name.into()]))
    }

    pub fn get_item_at(&self, ctx: &mut RequestContext<'_>, index: u32) -> TableColumn {
        TableColumn(getter(ctx, &self.0, "getItemAt", vec![index.into()]))
    }
}

impl TableColumn {
    pub fn get_range(&self, ctx: &mut RequestContext<'_>) -> Range {
        Range(getter(ctx, &self.0, "getRange", vec![]))
    }

    pub fn data_body_range(&self, ctx: &mut RequestContext<'_>) -> Range {
        Range(getter(ctx, &self.0, "getDataBodyRange", vec![]))
    }

    pub fn set_name(&self, ctx: &mut RequestContext<'_>, name: &str) {
        ctx.set(&self.0, "name", name);
    }

    /// Queue a load of this column's filter. The filter object itself is
    /// reachable only through the returned [`PendingFilter`].
    pub fn load_filter(&self, ctx: &mut RequestContext<'_>) -> PendingFilter {
        let op = ctx.load(&self.0, &["filter"]);
        PendingFilter {
            column: self.0.clone(),
            op,
        }
    }
}

/// A column filter whose load has been queued but maybe not synced.
#[derive(Debug, Clone)]
pub struct PendingFilter {
    column: ProxyHandle,
    op: OpId,
}

impl PendingFilter {
    /// The id of the queued load.
    pub fn op(&self) -> OpId {
        self.op
    }

    /// The filter, once a sync has carried its load.
    pub fn resolve(&self, ctx: &mut RequestContext<'_>) -> Result<ColumnFilter, ProxyError> {
        if !ctx.is_load_complete(self.op) {
            return Err(ProxyError::NotLoaded {
                path: self.column.path().to_string(),
                property: "filter".to_string(),
            });
        }
        Ok(ColumnFilter(ctx.navigate(&self.column, "filter")))
    }

    /// The criteria that were in effect when the filter was loaded.
    pub fn criteria<'c>(&self, ctx: &'c RequestContext<'_>) -> Result<&'c Value, ProxyError> {
        ctx.get(&self.column, "filter")
    }
}

impl ColumnFilter {
    /// Queue a filter that keeps only rows whose value is one of `values`.
    pub fn apply_values_filter(&self, ctx: &mut RequestContext<'_>, values: &[&str]) {
        let values: Vec<Value> = values.iter().map(|v| Value::from(*v)).collect();
        ctx.invoke(&self.0, "applyValuesFilter", vec![Value::List(values)]);
    }

    pub fn clear(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "clear", vec![]);
    }
}

/// One key of a table sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    /// Zero-based column index within the table.
    pub key: u32,
    pub ascending: bool,
}

impl From<SortField> for Value {
    fn from(field: SortField) -> Self {
        Value::Object(BTreeMap::from([
            ("key".to_string(), Value::from(field.key)),
            ("ascending".to_string(), Value::from(field.ascending)),
        ]))
    }
}

impl TableSort {
    pub fn apply(&self, ctx: &mut RequestContext<'_>, fields: &[SortField]) {
        ctx.invoke(&self.0, "apply", vec![Value::from(fields.to_vec())]);
    }

    pub fn clear(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "clear", vec![]);
    }
}

impl Range {
    pub fn set_values(&self, ctx: &mut RequestContext<'_>, values: Value) {
        ctx.set(&self.0, "values", values);
    }

    pub fn set_number_format(&self, ctx: &mut RequestContext<'_>, formats: Value) {
        ctx.set(&self.0, "numberFormat", formats);
    }

    pub fn format(&self, ctx: &mut RequestContext<'_>) -> RangeFormat {
        RangeFormat(ctx.navigate(&self.0, "format"))
    }

    pub fn load(&self, ctx: &mut RequestContext<'_>, properties: &[&str]) -> OpId {
        ctx.load(&self.0, properties)
    }

    pub fn address<'c>(&self, ctx: &'c RequestContext<'_>) -> Result<&'c str, ProxyError> {
        ctx.get_str(&self.0, "address")
    }

    pub fn values<'c>(&self, ctx: &'c RequestContext<'_>) -> Result<&'c Value, ProxyError> {
        ctx.get(&self.0, "values")
    }
}

impl RangeFormat {
    pub fn autofit_columns(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "autofitColumns", vec![]);
    }

    pub fn autofit_rows(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "autofitRows", vec![]);
    }
}

/// Chart types the host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    ColumnClustered,
    ColumnStacked,
    BarClustered,
    Line,
    Pie,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::ColumnClustered => "ColumnClustered",
            ChartType::ColumnStacked => "ColumnStacked",
            ChartType::BarClustered => "BarClustered",
            ChartType::Line => "Line",
            ChartType::Pie => "Pie",
        }
    }
}

/// Whether chart series run down columns or along rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeriesBy {
    /// Let the host decide.
    #[default]
    Auto,
    Columns,
    Rows,
}

impl SeriesBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesBy::Auto => "Auto",
            SeriesBy::Columns => "Columns",
            SeriesBy::Rows => "Rows",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    Top,
    Bottom,
    Left,
    Right,
    Corner,
}

impl LegendPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegendPosition::Top => "Top",
            LegendPosition::Bottom => "Bottom",
            LegendPosition::Left => "Left",
            LegendPosition::Right => "Right",
            LegendPosition::Corner => "Corner",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChartCollection {
    /// Queue creation of a chart over `source`.
    pub fn add(&self, ctx: &mut RequestContext<'_>, chart_type: ChartType, source: &Range, series_by: SeriesBy) -> Chart {
        Chart(ctx.invoke(
            &self.0,
            "add",
            vec![
                chart_type.as_str().into(),
                Value::from(&source.0),
                series_by.as_str().into(),
            ],
        ))
    }

    pub fn get_item(&self, ctx: &mut RequestContext<'_>, name: &str) -> Chart {
        Chart(getter(ctx, &self.0, "getItem", vec![name.into()]))
    }

    pub fn get_item_at(&self, ctx: &mut RequestContext<'_>, index: u32) -> Chart {
        Chart(getter(ctx, &self.0, "getItemAt", vec![index.into()]))
    }
}

impl Chart {
    /// Place the chart over the cells from `start` to `end`.
    pub fn set_position(&self, ctx: &mut RequestContext<'_>, start: &str, end: Option<&str>) {
        ctx.invoke(&self.0, "setPosition", vec![start.into(), end.into()]);
    }

    pub fn title(&self, ctx: &mut RequestContext<'_>) -> ChartTitle {
        ChartTitle(ctx.navigate(&self.0, "title"))
    }

    pub fn legend(&self, ctx: &mut RequestContext<'_>) -> ChartLegend {
        ChartLegend(ctx.navigate(&self.0, "legend"))
    }

    pub fn data_labels(&self, ctx: &mut RequestContext<'_>) -> ChartDataLabels {
        ChartDataLabels(ctx.navigate(&self.0, "dataLabels"))
    }

    pub fn series(&self, ctx: &mut RequestContext<'_>) -> ChartSeriesCollection {
        ChartSeriesCollection(ctx.navigate(&self.0, "series"))
    }

    pub fn load(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &["name", "chartType", "topLeftCell", "bottomRightCell"])
    }

    pub fn name<'c>(&self, ctx: &'c RequestContext<'_>) -> Result<&'c str, ProxyError> {
        ctx.get_str(&self.0, "name")
    }
}

impl ChartTitle {
    pub fn set_text(&self, ctx: &mut RequestContext<'_>, text: &str) {
        ctx.set(&self.0, "text", text);
    }
}

impl ChartLegend {
    pub fn set_position(&self, ctx: &mut RequestContext<'_>, position: LegendPosition) {
        ctx.set(&self.0, "position", position.as_str());
    }

    /// `legend.format.fill`.
    pub fn fill(&self, ctx: &mut RequestContext<'_>) -> ChartFill {
        let format = ctx.navigate(&self.0, "format");
        ChartFill(ctx.navigate(&format, "fill"))
    }
}

impl ChartFill {
    pub fn set_solid_color(&self, ctx: &mut RequestContext<'_>, color: &str) {
        ctx.invoke(&self.0, "setSolidColor", vec![color.into()]);
    }

    pub fn clear(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "clear", vec![]);
    }
}

impl ChartDataLabels {
    /// `dataLabels.format.font`.
    pub fn font(&self, ctx: &mut RequestContext<'_>) -> ChartFont {
        let format = ctx.navigate(&self.0, "format");
        ChartFont(ctx.navigate(&format, "font"))
    }
}

impl ChartFont {
    pub fn set_size(&self, ctx: &mut RequestContext<'_>, size: f64) {
        ctx.set(&self.0, "size", size);
    }

    pub fn set_color(&self, ctx: &mut RequestContext<'_>, color: &str) {
        ctx.set(&self.0, "color", color);
    }
}

impl ChartSeriesCollection {
    pub fn get_item_at(&self, ctx: &mut RequestContext<'_>, index: u32) -> ChartSeries {
        ChartSeries(getter(ctx, &self.0, "getItemAt", vec![index.into()]))
    }
}

impl ChartSeries {
    pub fn set_name(&self, ctx: &mut RequestContext<'_>, name: &str) {
        ctx.set(&self.0, "name", name);
    }

    pub fn load_name(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &["name"])
    }

    pub fn name<'c>(&self, ctx: &'c RequestContext<'_>) -> Result<&'c str, ProxyError> {
        ctx.get_str(&self.0, "name")
    }
}

impl WorksheetProtection {
    pub fn protect(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "protect", vec![]);
    }

    pub fn unprotect(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "unprotect", vec![]);
    }

    pub fn load(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &["protected"])
    }

    pub fn protected(&self, ctx: &RequestContext<'_>) -> Result<bool, ProxyError> {
        ctx.get_bool(&self.0, "protected")
    }
}

impl FreezePanes {
    /// Keep the top `count` rows in view while scrolling.
    pub fn freeze_rows(&self, ctx: &mut RequestContext<'_>, count: u32) {
        ctx.invoke(&self.0, "freezeRows", vec![count.into()]);
    }

    pub fn freeze_columns(&self, ctx: &mut RequestContext<'_>, count: u32) {
        ctx.invoke(&self.0, "freezeColumns", vec![count.into()]);
    }

    pub fn unfreeze(&self, ctx: &mut RequestContext<'_>) {
        ctx.invoke(&self.0, "unfreeze", vec![]);
    }

    pub fn load(&self, ctx: &mut RequestContext<'_>) -> OpId {
        ctx.load(&self.0, &["frozenRows", "frozenColumns"])
    }

    pub fn frozen_rows(&self, ctx: &RequestContext<'_>) -> Result<u32, ProxyError> {
        ctx.get_f64(&self.0, "frozenRows").map(|n| n as u32)
    }
}
